// src/pipeline/report.rs

//! Run progress reporting.
//!
//! The orchestrator never prints. Everything the operator sees goes through a
//! [`Reporter`], so callers pick the sink (log lines, a test recorder, ...).

use crate::models::{FeedOutcome, IngestionSummary, PlanEntry, Severity};

/// Sink for run progress.
pub trait Reporter: Send + Sync {
    /// The registry snapshot has been read.
    fn run_started(&self, active_feeds: usize, location: &str);

    /// One feed finished processing.
    fn feed_outcome(&self, outcome: &FeedOutcome);

    /// All feeds finished processing.
    fn run_finished(&self, summary: &IngestionSummary);
}

/// Reporter that writes through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn run_started(&self, active_feeds: usize, location: &str) {
        header("Feed trigger run");
        log::info!("{} active feeds in {}", active_feeds, location);
    }

    fn feed_outcome(&self, outcome: &FeedOutcome) {
        match outcome {
            FeedOutcome::Triggered {
                feed_name,
                ingested_at,
            } => log::info!("Triggered {} at {}", feed_name, ingested_at),
            FeedOutcome::Skipped {
                feed_name,
                next_eligible,
            } => log::info!("Skipped {} (next eligible {})", feed_name, next_eligible),
            FeedOutcome::Failed(failure) => match failure.severity {
                Severity::Warning => log::warn!(
                    "{} failed [{}]: {}",
                    failure.feed_name,
                    failure.kind,
                    failure.message
                ),
                Severity::Error => log::error!(
                    "{} failed [{}]: {}",
                    failure.feed_name,
                    failure.kind,
                    failure.message
                ),
                Severity::Critical => log::error!(
                    "{} was dispatched but not stamped [{}]: {}; it may be triggered again next run",
                    failure.feed_name,
                    failure.kind,
                    failure.message
                ),
            },
        }
    }

    fn run_finished(&self, summary: &IngestionSummary) {
        log_summary(
            "Feed trigger run",
            &[
                ("Active feeds", summary.active_feeds.to_string()),
                ("Triggered", summary.triggered_count.to_string()),
                ("Skipped", summary.skipped_count.to_string()),
                ("Failed", summary.failure_count().to_string()),
                ("Critical", summary.critical_count().to_string()),
            ],
        );
    }
}

/// Log a dry-run plan.
pub fn log_plan(entries: &[PlanEntry]) {
    header("Feed trigger plan");
    for entry in entries {
        match (&entry.decision, &entry.failure) {
            (Some(decision), _) => log::info!(
                "{:<40} {}",
                entry.feed_name,
                if decision.should_trigger() {
                    "would trigger"
                } else {
                    "not due"
                }
            ),
            (None, Some(failure)) => log::warn!(
                "{:<40} unreadable [{}]: {}",
                entry.feed_name,
                failure.kind,
                failure.message
            ),
            (None, None) => {}
        }
    }

    let due = entries.iter().filter(|e| e.would_trigger()).count();
    log_summary(
        "Feed trigger plan",
        &[
            ("Active feeds", entries.len().to_string()),
            ("Would trigger", due.to_string()),
        ],
    );
}

fn header(title: &str) {
    let border = "═".repeat(60);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

fn log_summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for (key, value) in items {
        log::info!("    {}: {}", key, value);
    }
}
