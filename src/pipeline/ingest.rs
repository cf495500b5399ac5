// src/pipeline/ingest.rs

//! Ingestion orchestrator.
//!
//! One run reads a snapshot of the active feeds, evaluates each one, and for
//! every due feed dispatches the ingestion job and stamps the registry.
//!
//! ```text
//! list_active ──► evaluate ──► NotDue ─────────────────────────► Skipped
//!                    │
//!                    ├──► Due / NeverIngested ─► invoke ─► update ─► Triggered
//!                    │                             │         │
//!                    └──► error ──────────────► Failed ◄─────┘
//! ```

use futures::stream::{self, StreamExt};

use crate::dispatch::{DispatchPayload, Dispatcher};
use crate::error::Result;
use crate::models::{FeedFailure, FeedOutcome, FeedRecord, IngestionSummary};
use crate::pipeline::Reporter;
use crate::registry::FeedRegistry;
use crate::services::{IngestionDecision, evaluate};
use crate::utils::{Clock, SystemClock};

/// Which job to run and which registry the feeds come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTarget {
    /// Name of the ingestion job (Lambda function)
    pub job_name: String,
    /// Registry dataset id, forwarded in every payload
    pub dataset_id: String,
}

impl JobTarget {
    pub fn new(job_name: impl Into<String>, dataset_id: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            dataset_id: dataset_id.into(),
        }
    }
}

/// Drives one pass over the registry.
pub struct IngestionOrchestrator<'a> {
    registry: &'a dyn FeedRegistry,
    dispatcher: &'a dyn Dispatcher,
    reporter: &'a dyn Reporter,
    clock: &'a dyn Clock,
    target: &'a JobTarget,
    max_concurrent: usize,
}

impl<'a> IngestionOrchestrator<'a> {
    pub fn new(
        registry: &'a dyn FeedRegistry,
        dispatcher: &'a dyn Dispatcher,
        reporter: &'a dyn Reporter,
        target: &'a JobTarget,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            reporter,
            clock: &SystemClock,
            target,
            max_concurrent: 1,
        }
    }

    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Allow up to `max_concurrent` feeds in flight. Zero is treated as one.
    pub fn with_concurrency(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Run once over all active feeds.
    ///
    /// Only a failure to list the feeds aborts the run; every per-feed
    /// problem is recorded in the summary.
    pub async fn run(&self) -> Result<IngestionSummary> {
        let snapshot = self.registry.list_active().await?;
        let active_feeds = snapshot.len();
        self.reporter
            .run_started(active_feeds, &self.registry.location());

        let mut outcomes: Vec<FeedOutcome> = snapshot
            .unreadable
            .iter()
            .map(|row| FeedOutcome::Failed(FeedFailure::unreadable(row)))
            .inspect(|outcome| self.reporter.feed_outcome(outcome))
            .collect();

        let processed: Vec<FeedOutcome> = stream::iter(snapshot.feeds)
            .map(|feed| self.process_feed(feed))
            .buffered(self.max_concurrent)
            .inspect(|outcome| self.reporter.feed_outcome(outcome))
            .collect()
            .await;
        outcomes.extend(processed);

        let summary = IngestionSummary::from_outcomes(active_feeds, outcomes);
        self.reporter.run_finished(&summary);
        Ok(summary)
    }

    async fn process_feed(&self, feed: FeedRecord) -> FeedOutcome {
        let now = self.clock.now();

        match evaluate(&feed, now) {
            Ok(IngestionDecision::NotDue { next_eligible }) => FeedOutcome::Skipped {
                feed_name: feed.name().to_string(),
                next_eligible,
            },
            Ok(decision) => {
                log::debug!("{} is due: {:?}", feed.name(), decision);
                self.trigger(feed).await
            }
            Err(e) => FeedOutcome::Failed(FeedFailure::new(&feed, &e, false)),
        }
    }

    /// Dispatch, then stamp. The timestamp is written only after the job
    /// runner has accepted the payload.
    async fn trigger(&self, mut feed: FeedRecord) -> FeedOutcome {
        let payload = DispatchPayload::new(&feed, &self.target.dataset_id);
        match self.dispatcher.invoke(&self.target.job_name, &payload).await {
            Ok(ack) => log::debug!(
                "Dispatched {} to {} (status {}, request {:?})",
                feed.name(),
                self.target.job_name,
                ack.status_code,
                ack.request_id
            ),
            Err(e) => return FeedOutcome::Failed(FeedFailure::new(&feed, &e, false)),
        }

        let ingested_at = self.clock.now();
        feed.mark_ingested(ingested_at);

        match self.registry.update(&feed).await {
            Ok(_) => FeedOutcome::Triggered {
                feed_name: feed.name().to_string(),
                ingested_at,
            },
            Err(e) => FeedOutcome::Failed(FeedFailure::new(&feed, &e, true)),
        }
    }
}
