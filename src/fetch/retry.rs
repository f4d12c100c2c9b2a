// Per-item fetch state machine.
//
// One call here produces exactly one FetchOutcome for one video ID, doing
// its own retrying internally. Rate-limit handling is stateful across the
// whole run (via RateLimitState); transient-error backoff is stateless and
// keyed on the attempt number. Retry-after hints from the server always
// take priority over computed delays.

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ScanTuning;
use crate::youtube::client::{ApiError, VideoStatsApi};

use super::backoff::backoff_delay;
use super::{FailureKind, FetchOutcome, RateLimitState};

/// Fetch the view count for one video, retrying per the tuning values.
///
/// Mutates `state` in place: resets the consecutive-429 counter on success,
/// increments it and arms the cooldown on each rate-limited response. When
/// the counter is already at the abort threshold this returns a rate-limited
/// failure without touching the API at all — the scheduler uses that to
/// stop the run.
pub async fn fetch_view_count(
    api: &dyn VideoStatsApi,
    video_id: &str,
    state: &mut RateLimitState,
    tuning: &ScanTuning,
) -> FetchOutcome {
    let threshold = tuning.rate_limit_abort_threshold;

    if state.at_abort_threshold(threshold) {
        return FetchOutcome::failure(
            FailureKind::RateLimited,
            format!(
                "rate-limit budget exhausted ({} consecutive)",
                state.consecutive_rate_limits()
            ),
            true,
        );
    }

    let mut last_error: Option<(FailureKind, String)> = None;

    for attempt in 1..=tuning.max_retries {
        // An active cooldown is a precondition, not a retry — wait it out
        // without consuming an attempt.
        state.wait_for_cooldown().await;

        match api.view_count(video_id).await {
            Ok(views) => {
                state.record_success();
                debug!(video_id, views, attempt, "Fetched view count");
                return FetchOutcome::Success { views };
            }

            Err(ApiError::RateLimited {
                retry_after,
                reset_in,
            }) => {
                state.record_rate_limit();

                // Wait priority: server's Retry-After, then its reset
                // timestamp, then exponential seeded by the consecutive
                // counter. Whatever wins is capped.
                let fallback =
                    rate_limit_fallback(tuning.initial_retry_delay, state.consecutive_rate_limits());
                let wait = retry_after
                    .or(reset_in)
                    .unwrap_or(fallback)
                    .min(tuning.max_retry_delay);
                state.begin_cooldown(wait);

                warn!(
                    video_id,
                    consecutive = state.consecutive_rate_limits(),
                    wait_ms = wait.as_millis() as u64,
                    "Rate limited (429)"
                );

                if state.at_abort_threshold(threshold) {
                    return FetchOutcome::failure(
                        FailureKind::RateLimited,
                        format!(
                            "{} consecutive rate-limited responses",
                            state.consecutive_rate_limits()
                        ),
                        true,
                    );
                }

                // The wait itself happens at the top of the next attempt,
                // via the cooldown precondition.
                last_error = Some((FailureKind::RateLimited, "rate limited (429)".to_string()));
            }

            Err(ApiError::Unavailable { detail }) => {
                // Transient server error: plain backoff keyed on the
                // attempt number. Does not touch the rate-limit counter.
                warn!(video_id, attempt, "Service unavailable, backing off");
                last_error = Some((FailureKind::NetworkFault, detail));
                if attempt < tuning.max_retries {
                    let delay =
                        backoff_delay(attempt, tuning.initial_retry_delay, tuning.max_retry_delay);
                    tokio::time::sleep(delay).await;
                }
            }

            Err(ApiError::Malformed { detail }) => {
                warn!(video_id, attempt, detail = %detail, "Unusable response");
                last_error = Some((FailureKind::MalformedResponse, detail));
                if attempt < tuning.max_retries {
                    let delay =
                        backoff_delay(attempt, tuning.initial_retry_delay, tuning.max_retry_delay);
                    tokio::time::sleep(delay).await;
                }
            }

            Err(ApiError::Network { detail }) => {
                warn!(video_id, attempt, detail = %detail, "Network fault");
                last_error = Some((FailureKind::NetworkFault, detail));
                if attempt < tuning.max_retries {
                    let delay =
                        backoff_delay(attempt, tuning.initial_retry_delay, tuning.max_retry_delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    // Attempts exhausted — surface whatever was observed last.
    let (kind, detail) = last_error
        .unwrap_or((FailureKind::NetworkFault, "no attempts configured".to_string()));
    FetchOutcome::Failure {
        kind,
        detail,
        rate_limited: state.consecutive_rate_limits() > 0,
    }
}

/// Fallback wait after the n-th consecutive 429 when the server sent no
/// hint: `initial * 2^n`.
fn rate_limit_fallback(initial: Duration, consecutive: u32) -> Duration {
    initial.saturating_mul(1u32 << consecutive.min(31))
}
