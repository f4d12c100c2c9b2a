// Progress store trait — backend-agnostic async interface for resume state.
//
// The scheduler's caller reads the cursor once at the start of a run and
// writes it at most once near the end; everything here is a thin wrapper
// over a flat key/value store. Async so a future backend with native async
// I/O fits behind the same interface the sync rusqlite one does.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Count the user-created tables (init confirmation).
    async fn table_count(&self) -> Result<i64>;

    // --- Resume cursor ---

    /// Last fully processed position for a dataset, if a partial run
    /// left one behind.
    async fn resume_position(&self, dataset: &str) -> Result<Option<u32>>;

    /// Record the resume position for a dataset (upsert).
    async fn set_resume_position(&self, dataset: &str, position: u32) -> Result<()>;

    /// Drop the cursor — called when a run completes a dataset fully.
    async fn clear_resume_position(&self, dataset: &str) -> Result<()>;

    // --- Run metadata ---

    /// Set a metadata value (e.g. "last_run_at").
    async fn set_meta(&self, key: &str, value: &str) -> Result<()>;

    /// Get a metadata value by key.
    async fn get_meta(&self, key: &str) -> Result<Option<String>>;

    /// Every stored key/value pair, for the status display.
    async fn all_entries(&self) -> Result<Vec<(String, String)>>;
}
