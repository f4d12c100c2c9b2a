// Fetch core — the retry/backoff/rate-limit machinery.
//
// `backoff` computes jittered exponential delays, `retry` runs the
// per-item fetch state machine, and this module holds the shared types:
// the outcome of a fetch sequence and the rate-limit state that threads
// through a whole scheduler run.

use std::time::Duration;

use tokio::time::Instant;

pub mod backoff;
pub mod retry;

pub use retry::fetch_view_count;

/// Why a fetch sequence (or a whole row) failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No video ID could be derived from the cell text. Never retried.
    InvalidUrl,
    /// Rate limiting ended the sequence — either the consecutive-429
    /// budget ran out or the last exhausted attempt was a 429.
    RateLimited,
    /// The response was unusable: bad JSON, no matching record, or an
    /// unexpected status.
    MalformedResponse,
    /// Transport-level or server-side fault.
    NetworkFault,
    /// Never attempted — the run aborted before reaching this row.
    SkippedForRetry,
}

impl FailureKind {
    /// Human-readable label used for grouping failures in the summary.
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::InvalidUrl => "invalid URL",
            FailureKind::RateLimited => "rate limited",
            FailureKind::MalformedResponse => "malformed response",
            FailureKind::NetworkFault => "network fault",
            FailureKind::SkippedForRetry => "skipped for retry",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Terminal result of one work item. Produced exactly once per item per
/// scheduler pass — retries happen inside the fetch, never by re-emitting.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Success {
        views: u64,
    },
    Failure {
        kind: FailureKind,
        detail: String,
        /// Whether rate limiting was in play when the sequence ended.
        rate_limited: bool,
    },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    pub fn failure(kind: FailureKind, detail: impl Into<String>, rate_limited: bool) -> Self {
        FetchOutcome::Failure {
            kind,
            detail: detail.into(),
            rate_limited,
        }
    }
}

/// Rate-limit pressure for one scheduler run.
///
/// Owned by the run and passed `&mut` into each fetch — never a process
/// singleton. The cooldown deadline is only ever compared against now;
/// once it is in the past it is simply inert, there is no clear step.
#[derive(Debug)]
pub struct RateLimitState {
    consecutive_rate_limits: u32,
    cooldown_until: Option<Instant>,
}

impl RateLimitState {
    pub fn new() -> Self {
        Self {
            consecutive_rate_limits: 0,
            cooldown_until: None,
        }
    }

    pub fn consecutive_rate_limits(&self) -> u32 {
        self.consecutive_rate_limits
    }

    /// Any successful fetch clears the pressure entirely.
    pub fn record_success(&mut self) {
        self.consecutive_rate_limits = 0;
    }

    pub fn record_rate_limit(&mut self) {
        self.consecutive_rate_limits += 1;
    }

    /// Start a cooldown `wait` from now. Always lands at or after now.
    pub fn begin_cooldown(&mut self, wait: Duration) {
        self.cooldown_until = Some(Instant::now() + wait);
    }

    pub fn at_abort_threshold(&self, threshold: u32) -> bool {
        self.consecutive_rate_limits >= threshold
    }

    /// Sleep until any active cooldown has elapsed. A deadline in the past
    /// returns immediately.
    pub async fn wait_for_cooldown(&self) {
        if let Some(until) = self.cooldown_until {
            if until > Instant::now() {
                tokio::time::sleep_until(until).await;
            }
        }
    }
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self::new()
    }
}
