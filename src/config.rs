use std::env;
use std::time::Duration;

use anyhow::Result;

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
pub struct Config {
    /// YouTube Data API v3 key — required for any command that fetches.
    pub api_key: String,
    /// API base URL (defaults to the real Data API endpoint).
    /// Overridable for testing against a local stub.
    pub api_base_url: String,
    /// Path to the CSV sheet holding the video URLs.
    pub sheet_path: String,
    pub db_path: String,
    /// Zero-based column index holding the video URLs.
    pub url_column: usize,
    /// Zero-based column index the view counts are written to.
    pub output_column: usize,
    /// First data row (zero-based, so 1 skips a header row).
    pub start_row: usize,
    /// Tuning values handed to the scheduler and fetcher.
    pub tuning: ScanTuning,
}

/// Tuning knobs for one scan run.
///
/// Passed explicitly into the scheduler and the per-item fetcher — there is
/// no process-global settings object, so tests can construct whatever
/// combination they need.
#[derive(Debug, Clone)]
pub struct ScanTuning {
    /// Items per batch.
    pub batch_size: usize,
    /// Fetch attempts per item before giving up.
    pub max_retries: u32,
    /// Seed for exponential retry delays.
    pub initial_retry_delay: Duration,
    /// Ceiling for any single retry or cooldown wait.
    pub max_retry_delay: Duration,
    /// Flat pause between consecutive items in a batch.
    pub api_call_delay: Duration,
    /// Pause between batches.
    pub batch_delay: Duration,
    /// Consecutive rate-limited responses before the run aborts.
    pub rate_limit_abort_threshold: u32,
    /// Cap on items attempted in one invocation.
    pub max_items_per_run: usize,
}

impl Default for ScanTuning {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_retries: 3,
            initial_retry_delay: Duration::from_millis(1000),
            max_retry_delay: Duration::from_millis(60_000),
            api_call_delay: Duration::from_millis(200),
            batch_delay: Duration::from_millis(1000),
            rate_limit_abort_threshold: 3,
            max_items_per_run: 500,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Only the API key and sheet path lack defaults — everything else
    /// falls back to values that work for a typical sheet.
    pub fn load() -> Result<Self> {
        let defaults = ScanTuning::default();

        let tuning = ScanTuning {
            batch_size: env_usize("VIEWTALLY_BATCH_SIZE", defaults.batch_size),
            max_retries: env_u32("VIEWTALLY_MAX_RETRIES", defaults.max_retries),
            initial_retry_delay: env_millis(
                "VIEWTALLY_INITIAL_RETRY_DELAY_MS",
                defaults.initial_retry_delay,
            ),
            max_retry_delay: env_millis("VIEWTALLY_MAX_RETRY_DELAY_MS", defaults.max_retry_delay),
            api_call_delay: env_millis("VIEWTALLY_API_CALL_DELAY_MS", defaults.api_call_delay),
            batch_delay: env_millis("VIEWTALLY_BATCH_DELAY_MS", defaults.batch_delay),
            rate_limit_abort_threshold: env_u32(
                "VIEWTALLY_ABORT_THRESHOLD",
                defaults.rate_limit_abort_threshold,
            ),
            max_items_per_run: env_usize("VIEWTALLY_MAX_ITEMS_PER_RUN", defaults.max_items_per_run),
        };

        Ok(Self {
            api_key: env::var("YOUTUBE_API_KEY").unwrap_or_default(),
            api_base_url: env::var("YOUTUBE_API_URL")
                .unwrap_or_else(|_| crate::youtube::client::DEFAULT_API_URL.to_string()),
            sheet_path: env::var("VIEWTALLY_SHEET").unwrap_or_default(),
            db_path: env::var("VIEWTALLY_DB_PATH").unwrap_or_else(|_| "./viewtally.db".to_string()),
            url_column: env_usize("VIEWTALLY_URL_COLUMN", 1),
            output_column: env_usize("VIEWTALLY_OUTPUT_COLUMN", 2),
            start_row: env_usize("VIEWTALLY_START_ROW", 1),
            tuning,
        })
    }

    /// Check that the API key is configured.
    /// Call this before any command that talks to the Data API.
    pub fn require_api_key(&self) -> Result<()> {
        if self.api_key.is_empty() {
            anyhow::bail!(
                "YOUTUBE_API_KEY not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        Ok(())
    }

    /// Check that a sheet path is configured, either via VIEWTALLY_SHEET
    /// or a --sheet argument already merged into the config.
    pub fn require_sheet(&self) -> Result<()> {
        if self.sheet_path.is_empty() {
            anyhow::bail!(
                "No sheet configured. Set VIEWTALLY_SHEET in your .env file\n\
                 or pass --sheet <path> on the command line."
            );
        }
        Ok(())
    }

    /// Dataset key for the configured sheet — the file stem, so cursors
    /// survive the sheet being referenced via different relative paths.
    pub fn dataset_key(&self) -> String {
        std::path::Path::new(&self.sheet_path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.sheet_path.clone())
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_millis(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}
