//! Run summary structures.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{AppError, ErrorKind};
use crate::models::{FeedRecord, UnreadableRow};
use crate::services::IngestionDecision;

/// How urgently a per-feed failure needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Likely to clear on the next run
    Warning,
    /// Needs a registry or job fix, feed skipped until then
    Error,
    /// Job was dispatched but the registry was not stamped; may re-trigger
    Critical,
}

/// A feed that could not be processed this run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedFailure {
    pub feed_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_id: Option<String>,
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
}

impl FeedFailure {
    /// Build a failure for a feed, choosing severity from the error kind.
    ///
    /// `dispatched` marks failures that happened after the job was accepted.
    pub fn new(feed: &FeedRecord, error: &AppError, dispatched: bool) -> Self {
        let kind = error.kind();
        let severity = if dispatched {
            Severity::Critical
        } else {
            match kind {
                ErrorKind::DispatchUnavailable | ErrorKind::RegistryUnavailable => Severity::Warning,
                _ => Severity::Error,
            }
        };

        Self {
            feed_name: feed.name().to_string(),
            row_id: feed.row_id.clone(),
            kind,
            severity,
            message: error.to_string(),
        }
    }
}

impl FeedFailure {
    /// Failure for a row the registry returned but that could not be read.
    pub fn unreadable(row: &UnreadableRow) -> Self {
        let error = AppError::validation(format!("unreadable registry row: {}", row.message));
        Self {
            feed_name: row.name().to_string(),
            row_id: row.row_id.clone(),
            kind: error.kind(),
            severity: Severity::Error,
            message: error.to_string(),
        }
    }
}

/// What happened to a single feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FeedOutcome {
    /// Job dispatched and registry stamped
    Triggered {
        feed_name: String,
        ingested_at: DateTime<Utc>,
    },
    /// Not yet due
    Skipped {
        feed_name: String,
        next_eligible: DateTime<Utc>,
    },
    /// Evaluation, dispatch or stamping failed
    Failed(FeedFailure),
}

/// Result of one orchestrator run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestionSummary {
    /// Active feeds returned by the registry
    pub active_feeds: usize,
    /// Feeds whose ingestion job was dispatched
    pub triggered_count: usize,
    /// Feeds evaluated as not yet due
    pub skipped_count: usize,
    /// Per-feed failures, in registry order
    pub failures: Vec<FeedFailure>,
}

impl IngestionSummary {
    /// Fold per-feed outcomes into a summary.
    pub fn from_outcomes(active_feeds: usize, outcomes: impl IntoIterator<Item = FeedOutcome>) -> Self {
        let mut summary = Self {
            active_feeds,
            ..Self::default()
        };
        for outcome in outcomes {
            summary.record(outcome);
        }
        summary
    }

    /// Account for one outcome.
    pub fn record(&mut self, outcome: FeedOutcome) {
        match outcome {
            FeedOutcome::Triggered { .. } => self.triggered_count += 1,
            FeedOutcome::Skipped { .. } => self.skipped_count += 1,
            FeedOutcome::Failed(failure) => {
                // A stamping failure still means the job went out.
                if failure.severity == Severity::Critical {
                    self.triggered_count += 1;
                }
                self.failures.push(failure);
            }
        }
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Failures where a job was dispatched but the timestamp was not written.
    pub fn critical_count(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.severity == Severity::Critical)
            .count()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Dry-run decision for one feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanEntry {
    pub feed_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<IngestionDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FeedFailure>,
}

impl PlanEntry {
    pub fn would_trigger(&self) -> bool {
        self.decision.is_some_and(|d| d.should_trigger())
    }
}
