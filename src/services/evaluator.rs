// src/services/evaluator.rs

//! Per-feed ingestion decision.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::FeedRecord;
use crate::services::frequency::ParsedFrequency;
use crate::services::schedule::next_eligible_instant;

/// Outcome of evaluating one feed at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum IngestionDecision {
    /// No last-ingested timestamp; always due
    NeverIngested,
    /// `now` is strictly past the next eligible instant
    Due { next_eligible: DateTime<Utc> },
    /// Not yet eligible
    NotDue { next_eligible: DateTime<Utc> },
}

impl IngestionDecision {
    /// Whether the feed should be dispatched.
    pub fn should_trigger(&self) -> bool {
        !matches!(self, IngestionDecision::NotDue { .. })
    }
}

/// Decide whether `feed` is due at `now`.
///
/// A blank or missing timestamp short-circuits to `NeverIngested` without
/// looking at the frequency. Otherwise a malformed frequency or timestamp is
/// returned as an error for the caller to report.
pub fn evaluate(feed: &FeedRecord, now: DateTime<Utc>) -> Result<IngestionDecision> {
    let Some(last_ingested) = feed.last_ingested() else {
        return Ok(IngestionDecision::NeverIngested);
    };

    let frequency = ParsedFrequency::parse_opt(feed.update_frequency.as_deref())?;
    let next_eligible = next_eligible_instant(last_ingested, &frequency)?;

    if now > next_eligible {
        Ok(IngestionDecision::Due { next_eligible })
    } else {
        Ok(IngestionDecision::NotDue { next_eligible })
    }
}
