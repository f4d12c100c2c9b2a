// SqliteProgressStore — rusqlite backend implementing the ProgressStore trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Send.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The lock is never held across .await points — Rust enforces this because
// MutexGuard is !Send.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::traits::ProgressStore;

pub struct SqliteProgressStore {
    conn: Mutex<Connection>,
}

impl SqliteProgressStore {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

fn cursor_key(dataset: &str) -> String {
    format!("cursor:{dataset}")
}

#[async_trait]
impl ProgressStore for SqliteProgressStore {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn resume_position(&self, dataset: &str) -> Result<Option<u32>> {
        let conn = self.conn.lock().await;
        let raw = super::queries::get_value(&conn, &cursor_key(dataset))?;
        // A corrupted value is treated as no cursor rather than a fatal
        // error — the worst case is reprocessing rows idempotently.
        Ok(raw.and_then(|v| v.parse().ok()))
    }

    async fn set_resume_position(&self, dataset: &str, position: u32) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::set_value(&conn, &cursor_key(dataset), &position.to_string())
    }

    async fn clear_resume_position(&self, dataset: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::delete_value(&conn, &cursor_key(dataset))
    }

    async fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::set_value(&conn, key, value)
    }

    async fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        super::queries::get_value(&conn, key)
    }

    async fn all_entries(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock().await;
        super::queries::all_values(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;

    fn test_store() -> SqliteProgressStore {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        SqliteProgressStore::new(conn)
    }

    #[tokio::test]
    async fn test_cursor_lifecycle() {
        let store = test_store();

        assert_eq!(store.resume_position("clips").await.unwrap(), None);

        store.set_resume_position("clips", 17).await.unwrap();
        assert_eq!(store.resume_position("clips").await.unwrap(), Some(17));

        // Another dataset is unaffected
        assert_eq!(store.resume_position("other").await.unwrap(), None);

        store.clear_resume_position("clips").await.unwrap();
        assert_eq!(store.resume_position("clips").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cursor_overwrite() {
        let store = test_store();
        store.set_resume_position("clips", 5).await.unwrap();
        store.set_resume_position("clips", 12).await.unwrap();
        assert_eq!(store.resume_position("clips").await.unwrap(), Some(12));
    }

    #[tokio::test]
    async fn test_corrupted_cursor_reads_as_absent() {
        let store = test_store();
        store.set_meta("cursor:clips", "not-a-number").await.unwrap();
        assert_eq!(store.resume_position("clips").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_meta_roundtrip() {
        let store = test_store();
        assert_eq!(store.get_meta("last_run_at").await.unwrap(), None);

        store.set_meta("last_run_at", "2026-08-07T12:00:00Z").await.unwrap();
        assert_eq!(
            store.get_meta("last_run_at").await.unwrap(),
            Some("2026-08-07T12:00:00Z".to_string())
        );
    }
}
