// src/pipeline/plan.rs

//! Dry run: evaluate every active feed without dispatching or writing.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{FeedFailure, FeedRecord, PlanEntry};
use crate::registry::FeedRegistry;
use crate::services::evaluate;

/// Evaluate all active feeds at `now`.
pub async fn plan(registry: &dyn FeedRegistry, now: DateTime<Utc>) -> Result<Vec<PlanEntry>> {
    let snapshot = registry.list_active().await?;
    let unreadable = snapshot.unreadable.iter().map(|row| PlanEntry {
        feed_name: row.name().to_string(),
        row_id: row.row_id.clone(),
        decision: None,
        failure: Some(FeedFailure::unreadable(row)),
    });
    Ok(unreadable
        .chain(snapshot.feeds.iter().map(|feed| plan_feed(feed, now)))
        .collect())
}

/// Evaluate a single feed.
pub fn plan_feed(feed: &FeedRecord, now: DateTime<Utc>) -> PlanEntry {
    let (decision, failure) = match evaluate(feed, now) {
        Ok(decision) => (Some(decision), None),
        Err(e) => (None, Some(FeedFailure::new(feed, &e, false))),
    };

    PlanEntry {
        feed_name: feed.name().to_string(),
        row_id: feed.row_id.clone(),
        decision,
        failure,
    }
}
