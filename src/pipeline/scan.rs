// Batch scheduler — drives the per-item fetcher over the candidate rows.
//
// Strictly sequential: one item at a time, flat pauses between items in a
// batch and between batches. One RateLimitState is shared across the whole
// run, because rate-limit pressure is a property of the run, not of any
// single batch. When the consecutive-429 budget runs out the scheduler
// stops early, tags everything unattempted as skipped, and reports the
// position a follow-up run should resume after.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::ScanTuning;
use crate::fetch::{fetch_view_count, FailureKind, FetchOutcome, RateLimitState};
use crate::sheet::CandidateRow;
use crate::youtube::client::VideoStatsApi;
use crate::youtube::url::extract_video_id;

/// One row's worth of pending work: its sheet position and the raw cell
/// text the video ID gets derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub position: u32,
    pub url: String,
}

/// A work item paired with its terminal outcome.
#[derive(Debug, Clone)]
pub struct ItemResult {
    pub item: WorkItem,
    pub outcome: FetchOutcome,
}

/// Everything a run produced, in input order — exactly one outcome per
/// input item, aborted or not.
#[derive(Debug)]
pub struct RunReport {
    pub results: Vec<ItemResult>,
    /// True when the rate-limit abort threshold ended the run early.
    pub aborted: bool,
    /// On abort: the position of the last item that completed its fetch
    /// sequence before the aborting one, if any. The caller persists this
    /// so the next run resumes strictly after it; the aborting item itself
    /// stays eligible for retry.
    pub resume_position: Option<u32>,
    pub duration: Duration,
}

impl RunReport {
    /// Positions and values of the successful fetches, for the sheet
    /// write-back.
    pub fn successes(&self) -> Vec<(u32, u64)> {
        self.results
            .iter()
            .filter_map(|r| match r.outcome {
                FetchOutcome::Success { views } => Some((r.item.position, views)),
                _ => None,
            })
            .collect()
    }

    /// Position of the last item in the input, attempted or not.
    pub fn last_position(&self) -> Option<u32> {
        self.results.last().map(|r| r.item.position)
    }
}

/// Turn candidate rows into the run's work list: drop everything at or
/// before the resume cursor, then cap at `max_items`. Relative order is
/// preserved. The second value reports whether the cap truncated the list —
/// the caller needs that to know a "complete" run didn't finish the sheet.
pub fn eligible_items(
    candidates: Vec<CandidateRow>,
    cursor: Option<u32>,
    max_items: usize,
) -> (Vec<WorkItem>, bool) {
    let mut items: Vec<WorkItem> = candidates
        .into_iter()
        .filter(|row| cursor.map_or(true, |p| row.position > p))
        .map(|row| WorkItem {
            position: row.position,
            url: row.url,
        })
        .collect();

    let truncated = items.len() > max_items;
    if truncated {
        items.truncate(max_items);
    }
    (items, truncated)
}

/// Process `items` in batches of `tuning.batch_size`, in order.
///
/// Per item: derive the video ID (a row with no derivable ID is recorded
/// as `InvalidUrl` without an API call), fetch with retry, pause. When
/// `RateLimitState` reaches the abort threshold, every remaining item is
/// recorded as `SkippedForRetry` and the run returns early.
pub async fn run(api: &dyn VideoStatsApi, items: Vec<WorkItem>, tuning: &ScanTuning) -> RunReport {
    let started = Instant::now();
    let total = items.len();
    let batch_size = tuning.batch_size.max(1);

    let mut state = RateLimitState::new();
    let mut results: Vec<ItemResult> = Vec::with_capacity(total);
    let mut last_completed: Option<u32> = None;
    let mut aborted = false;

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Fetching [{bar:30}] {pos}/{len} ({eta})")
            .unwrap(),
    );

    for idx in 0..total {
        let item = &items[idx];

        let outcome = match extract_video_id(&item.url) {
            None => {
                debug!(position = item.position, "No video ID in cell");
                FetchOutcome::failure(
                    FailureKind::InvalidUrl,
                    format!("no video ID in {:?}", item.url),
                    false,
                )
            }
            Some(id) => fetch_view_count(api, &id, &mut state, tuning).await,
        };

        let tripped = state.at_abort_threshold(tuning.rate_limit_abort_threshold);

        results.push(ItemResult {
            item: item.clone(),
            outcome,
        });
        pb.inc(1);

        if tripped {
            warn!(
                position = item.position,
                attempted = results.len(),
                remaining = total - results.len(),
                "Rate-limit budget exhausted, aborting run"
            );
            for rest in &items[idx + 1..] {
                results.push(ItemResult {
                    item: rest.clone(),
                    outcome: FetchOutcome::failure(
                        FailureKind::SkippedForRetry,
                        "run aborted on rate limiting",
                        true,
                    ),
                });
            }
            aborted = true;
            break;
        }

        last_completed = Some(item.position);

        // Flat pacing: a batch boundary gets the batch pause, anything
        // else the inter-call pause. Nothing after the final item.
        if idx + 1 < total {
            let pause = if (idx + 1) % batch_size == 0 {
                tuning.batch_delay
            } else {
                tuning.api_call_delay
            };
            tokio::time::sleep(pause).await;
        }
    }
    pb.finish_and_clear();

    RunReport {
        results,
        aborted,
        resume_position: if aborted { last_completed } else { None },
        duration: started.elapsed(),
    }
}
