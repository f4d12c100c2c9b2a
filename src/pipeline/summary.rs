// Run summary — aggregate counts for the end-of-run report.

use std::time::Duration;

use crate::fetch::{FailureKind, FetchOutcome};

use super::scan::RunReport;

/// Kinds in display order, so grouped failure output is stable.
pub const KIND_ORDER: [FailureKind; 5] = [
    FailureKind::InvalidUrl,
    FailureKind::RateLimited,
    FailureKind::MalformedResponse,
    FailureKind::NetworkFault,
    FailureKind::SkippedForRetry,
];

/// Aggregate view of one run: what happened to how many rows.
#[derive(Debug)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    /// Terminal failures of any kind, skipped rows included.
    pub failed: usize,
    /// Outcomes where rate limiting was in play.
    pub rate_limited: usize,
    /// Rows never attempted because the run aborted.
    pub skipped: usize,
    /// (kind, count) for every failure kind that occurred, in KIND_ORDER.
    pub failures_by_kind: Vec<(FailureKind, usize)>,
    pub aborted: bool,
    pub duration: Duration,
}

impl RunSummary {
    pub fn from_report(report: &RunReport) -> Self {
        let total = report.results.len();
        let mut succeeded = 0;
        let mut rate_limited_count = 0;
        let mut skipped = 0;
        let mut counts = [0usize; KIND_ORDER.len()];

        for result in &report.results {
            match &result.outcome {
                FetchOutcome::Success { .. } => succeeded += 1,
                FetchOutcome::Failure {
                    kind, rate_limited, ..
                } => {
                    if *rate_limited {
                        rate_limited_count += 1;
                    }
                    if *kind == FailureKind::SkippedForRetry {
                        skipped += 1;
                    }
                    if let Some(slot) = KIND_ORDER.iter().position(|k| k == kind) {
                        counts[slot] += 1;
                    }
                }
            }
        }

        let failures_by_kind: Vec<(FailureKind, usize)> = KIND_ORDER
            .iter()
            .zip(counts)
            .filter(|(_, n)| *n > 0)
            .map(|(k, n)| (*k, n))
            .collect();

        Self {
            total,
            succeeded,
            failed: total - succeeded,
            rate_limited: rate_limited_count,
            skipped,
            failures_by_kind,
            aborted: report.aborted,
            duration: report.duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::scan::{ItemResult, WorkItem};

    fn item(position: u32) -> WorkItem {
        WorkItem {
            position,
            url: format!("https://youtu.be/vid{position:08}"),
        }
    }

    fn report(results: Vec<ItemResult>, aborted: bool) -> RunReport {
        RunReport {
            results,
            aborted,
            resume_position: None,
            duration: Duration::from_secs(3),
        }
    }

    #[test]
    fn test_all_success_summary() {
        let results = (1..=4)
            .map(|i| ItemResult {
                item: item(i),
                outcome: FetchOutcome::Success { views: 10 },
            })
            .collect();

        let summary = RunSummary::from_report(&report(results, false));

        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.skipped, 0);
        assert!(summary.failures_by_kind.is_empty());
        assert!(!summary.aborted);
    }

    #[test]
    fn test_mixed_outcomes_grouped_by_kind() {
        let results = vec![
            ItemResult {
                item: item(1),
                outcome: FetchOutcome::Success { views: 10 },
            },
            ItemResult {
                item: item(2),
                outcome: FetchOutcome::failure(FailureKind::InvalidUrl, "n/a", false),
            },
            ItemResult {
                item: item(3),
                outcome: FetchOutcome::failure(FailureKind::RateLimited, "429", true),
            },
            ItemResult {
                item: item(4),
                outcome: FetchOutcome::failure(FailureKind::SkippedForRetry, "aborted", true),
            },
            ItemResult {
                item: item(5),
                outcome: FetchOutcome::failure(FailureKind::SkippedForRetry, "aborted", true),
            },
        ];

        let summary = RunSummary::from_report(&report(results, true));

        assert_eq!(summary.total, 5);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 4);
        assert_eq!(summary.rate_limited, 3);
        assert_eq!(summary.skipped, 2);
        assert!(summary.aborted);
        assert_eq!(
            summary.failures_by_kind,
            vec![
                (FailureKind::InvalidUrl, 1),
                (FailureKind::RateLimited, 1),
                (FailureKind::SkippedForRetry, 2),
            ]
        );
    }
}
