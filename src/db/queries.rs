// Database queries — CRUD for the progress key/value table.
//
// Every database interaction goes through this module. This keeps SQL
// out of the rest of the codebase and gives the trait impl one obvious
// place to delegate to.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

/// Get a progress value by key.
pub fn get_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM progress WHERE key = ?1")?;
    let result = stmt.query_row(params![key], |row| row.get(0)).optional()?;
    Ok(result)
}

/// Set a progress value (upsert).
pub fn set_value(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO progress (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

/// Delete a progress value. Deleting a missing key is not an error.
pub fn delete_value(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM progress WHERE key = ?1", params![key])?;
    Ok(())
}

/// All stored keys and values, ordered by key for stable display.
pub fn all_values(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare("SELECT key, value FROM progress ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    #[test]
    fn test_value_roundtrip() {
        let conn = test_db();
        assert_eq!(get_value(&conn, "cursor:clips").unwrap(), None);

        set_value(&conn, "cursor:clips", "42").unwrap();
        assert_eq!(
            get_value(&conn, "cursor:clips").unwrap(),
            Some("42".to_string())
        );

        // Upsert overwrites
        set_value(&conn, "cursor:clips", "57").unwrap();
        assert_eq!(
            get_value(&conn, "cursor:clips").unwrap(),
            Some("57".to_string())
        );
    }

    #[test]
    fn test_delete_is_idempotent() {
        let conn = test_db();
        set_value(&conn, "cursor:clips", "42").unwrap();

        delete_value(&conn, "cursor:clips").unwrap();
        assert_eq!(get_value(&conn, "cursor:clips").unwrap(), None);

        // Deleting again is fine
        delete_value(&conn, "cursor:clips").unwrap();
    }

    #[test]
    fn test_all_values_ordered_by_key() {
        let conn = test_db();
        set_value(&conn, "last_run_at", "2026-08-07").unwrap();
        set_value(&conn, "cursor:clips", "42").unwrap();

        let entries = all_values(&conn).unwrap();
        assert_eq!(
            entries,
            vec![
                ("cursor:clips".to_string(), "42".to_string()),
                ("last_run_at".to_string(), "2026-08-07".to_string()),
            ]
        );
    }
}
