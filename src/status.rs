// System status display — shows DB stats, saved resume cursors, last run.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::db::ProgressStore;

/// Display system status to the terminal.
pub async fn show(store: &Arc<dyn ProgressStore>, db_display_path: &str) -> Result<()> {
    if !Path::new(db_display_path).exists() {
        println!("Database: not initialized");
        println!("\nRun `viewtally init` to set up the database.");
        return Ok(());
    }

    // Database file size
    let file_size = std::fs::metadata(db_display_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", db_display_path, file_size);

    let entries = store.all_entries().await?;

    // Saved cursors — one per partially processed dataset
    let cursors: Vec<_> = entries
        .iter()
        .filter_map(|(k, v)| k.strip_prefix("cursor:").map(|d| (d, v.as_str())))
        .collect();

    if cursors.is_empty() {
        println!("Resume cursors: none (no partial runs pending)");
    } else {
        println!("Resume cursors:");
        for (dataset, position) in cursors {
            println!("  {dataset}: row {position} — `viewtally scan` continues after it");
        }
    }

    // Last run
    match store.get_meta("last_run_at").await? {
        Some(at) => println!("Last run: {at}"),
        None => println!("Last run: never"),
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
