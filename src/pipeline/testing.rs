//! In-memory collaborators for pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::dispatch::{DispatchAck, DispatchPayload, Dispatcher};
use crate::error::{AppError, Result};
use crate::models::{FeedOutcome, FeedRecord, IngestionSummary, UnreadableRow};
use crate::pipeline::Reporter;
use crate::registry::{ActiveFeeds, FeedRegistry, UpdateAck};

/// Registry holding rows in a vector.
#[derive(Default)]
pub struct MemoryRegistry {
    pub rows: Mutex<Vec<FeedRecord>>,
    pub updates: Mutex<Vec<FeedRecord>>,
    /// Rows returned alongside the feeds as unreadable
    pub unreadable: Vec<UnreadableRow>,
    pub list_error: Option<fn() -> AppError>,
    pub update_error: Option<fn() -> AppError>,
}

impl MemoryRegistry {
    pub fn with_rows(rows: Vec<FeedRecord>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    pub fn row(&self, row_id: &str) -> FeedRecord {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.row_id.as_deref() == Some(row_id))
            .cloned()
            .unwrap()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }
}

#[async_trait]
impl FeedRegistry for MemoryRegistry {
    async fn list_active(&self) -> Result<ActiveFeeds> {
        if let Some(error) = self.list_error {
            return Err(error());
        }
        let feeds = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.active)
            .cloned()
            .collect();
        Ok(ActiveFeeds {
            feeds,
            unreadable: self.unreadable.clone(),
        })
    }

    async fn update(&self, feed: &FeedRecord) -> Result<UpdateAck> {
        if let Some(error) = self.update_error {
            return Err(error());
        }
        let mut rows = self.rows.lock().unwrap();
        let slot = rows
            .iter_mut()
            .find(|r| r.row_id == feed.row_id)
            .ok_or_else(|| AppError::RegistryWrite("unknown row".into()))?;
        *slot = feed.clone();
        self.updates.lock().unwrap().push(feed.clone());
        Ok(UpdateAck {
            rows_updated: 1,
            rows_created: 0,
        })
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// Dispatcher that records payloads.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub calls: Mutex<Vec<(String, Value)>>,
    /// Feeds whose dispatch fails, by name
    pub failing: HashMap<String, fn() -> AppError>,
    /// Per-feed latency, by name
    pub delays: HashMap<String, Duration>,
}

impl RecordingDispatcher {
    pub fn dispatched_names(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, payload)| payload["feed"]["feedname"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn invoke(&self, job_name: &str, payload: &DispatchPayload<'_>) -> Result<DispatchAck> {
        let name = payload.feed.name().to_string();
        if let Some(delay) = self.delays.get(&name) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(error) = self.failing.get(&name) {
            return Err(error());
        }
        self.calls
            .lock()
            .unwrap()
            .push((job_name.to_string(), serde_json::to_value(payload)?));
        Ok(DispatchAck {
            status_code: 202,
            request_id: None,
        })
    }
}

/// Reporter that keeps every event.
#[derive(Default)]
pub struct RecordingReporter {
    pub started: Mutex<Option<usize>>,
    pub outcomes: Mutex<Vec<FeedOutcome>>,
    pub finished: Mutex<Option<IngestionSummary>>,
}

impl Reporter for RecordingReporter {
    fn run_started(&self, active_feeds: usize, _location: &str) {
        *self.started.lock().unwrap() = Some(active_feeds);
    }

    fn feed_outcome(&self, outcome: &FeedOutcome) {
        self.outcomes.lock().unwrap().push(outcome.clone());
    }

    fn run_finished(&self, summary: &IngestionSummary) {
        *self.finished.lock().unwrap() = Some(summary.clone());
    }
}

/// A registry row with an id.
pub fn feed(row_id: &str, name: &str, frequency: &str, last_ingested: Option<&str>) -> FeedRecord {
    let mut feed = FeedRecord::new(name, frequency);
    feed.row_id = Some(row_id.to_string());
    feed.last_ingested = last_ingested.map(str::to_string);
    feed.extra
        .insert("url".to_string(), Value::String(format!("https://example.com/{name}")));
    feed
}
