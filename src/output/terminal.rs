// Colored terminal output for run summaries.
//
// This module handles all terminal-specific formatting: colors, counts,
// grouped failure listings. The main.rs display calls delegate here.

use colored::Colorize;

use crate::fetch::{FailureKind, FetchOutcome};
use crate::pipeline::scan::RunReport;
use crate::pipeline::summary::RunSummary;

/// Display the end-of-run summary: aggregate counts plus failures grouped
/// by reason.
pub fn display_run_summary(report: &RunReport) {
    let summary = RunSummary::from_report(report);

    if summary.aborted {
        println!("\n{}", "Scan aborted on rate limiting.".yellow().bold());
    } else {
        println!("\n{}", "Scan complete.".bold());
    }

    println!("  Rows processed:  {}", summary.total - summary.skipped);
    println!("  View counts written: {}", summary.succeeded);
    if summary.failed > 0 {
        println!("  Failed:          {}", summary.failed - summary.skipped);
    }
    if summary.skipped > 0 {
        println!(
            "  Deferred to next run: {}",
            summary.skipped.to_string().yellow()
        );
    }
    if summary.rate_limited > 0 {
        println!(
            "  Rate limited:    {}",
            summary.rate_limited.to_string().yellow()
        );
    }
    println!("  Duration:        {:.1}s", summary.duration.as_secs_f64());

    display_failure_groups(report);
}

/// List failed rows grouped by failure kind, worst detail first in each
/// group. Skipped rows are summarized as a count, not listed row by row.
fn display_failure_groups(report: &RunReport) {
    let summary = RunSummary::from_report(report);

    for (kind, count) in &summary.failures_by_kind {
        if *kind == FailureKind::SkippedForRetry {
            continue;
        }

        println!(
            "\n  {} ({count})",
            format!("{}:", heading_for(*kind)).red().bold()
        );

        for result in &report.results {
            if let FetchOutcome::Failure { kind: k, detail, .. } = &result.outcome {
                if k == kind {
                    println!(
                        "    row {:<5} {}",
                        result.item.position,
                        crate::output::truncate_chars(detail, 90).dimmed()
                    );
                }
            }
        }
    }
}

fn heading_for(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::InvalidUrl => "Rows without a recognizable video URL",
        FailureKind::RateLimited => "Rows abandoned to rate limiting",
        FailureKind::MalformedResponse => "Rows with unusable API responses",
        FailureKind::NetworkFault => "Rows with network faults",
        FailureKind::SkippedForRetry => "Rows deferred",
    }
}
