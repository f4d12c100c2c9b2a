// Progress persistence — SQLite storage for resume cursors and run metadata.
//
// We use rusqlite with the "bundled" feature so there's no system SQLite
// dependency. The database file lives wherever VIEWTALLY_DB_PATH points
// (defaults to ./viewtally.db).

pub mod queries;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use sqlite::SqliteProgressStore;
pub use traits::ProgressStore;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;

/// Open (or create) the database and run migrations, returning the store.
///
/// This is the main entry point — called by `viewtally init` and by any
/// command that needs progress access.
pub fn initialize(db_path: &str) -> Result<Arc<dyn ProgressStore>> {
    // Create parent directories if needed
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory for database: {}", db_path))?;
        }
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    // Enable WAL mode for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;

    schema::create_tables(&conn)?;

    Ok(Arc::new(SqliteProgressStore::new(conn)))
}

/// Open an existing database (fails if it doesn't exist yet).
pub fn open(db_path: &str) -> Result<Arc<dyn ProgressStore>> {
    if !Path::new(db_path).exists() {
        anyhow::bail!(
            "Database not found at {}. Run `viewtally init` first.",
            db_path
        );
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;

    // Safe on every open — table creation is idempotent.
    schema::create_tables(&conn)?;

    Ok(Arc::new(SqliteProgressStore::new(conn)))
}
