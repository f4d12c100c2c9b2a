// Database schema — table creation and migrations.
//
// We use a simple version-based migration approach: a `schema_version` table
// tracks which migrations have run. There is only one data table today — a
// flat key/value store — but the machinery is in place for when that changes.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet.
///
/// This is idempotent — safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Tracks schema version for future migrations
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Progress state — resume cursors per dataset plus run metadata.
        -- A single-row upsert per write keeps each key atomic, so an
        -- interrupted run can never leave a half-written cursor behind.
        CREATE TABLE IF NOT EXISTS progress (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )
    .context("Failed to create database tables")?;

    // Record initial schema version if not already set
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        // Running create_tables twice should not error
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
    }

    #[test]
    fn test_table_count() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        // schema_version + progress
        assert_eq!(table_count(&conn).unwrap(), 2);
    }
}
