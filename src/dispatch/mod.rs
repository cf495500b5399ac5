//! Ingestion job dispatch.
//!
//! A dispatch hands one feed record to the ingestion job and returns once
//! the job has accepted it; the job itself runs asynchronously.

#[cfg(feature = "aws")]
pub mod lambda;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::models::FeedRecord;

#[cfg(feature = "aws")]
pub use lambda::LambdaDispatcher;

/// Payload delivered to the ingestion job.
///
/// The record is sent exactly as read from the registry.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DispatchPayload<'a> {
    pub feed: &'a FeedRecord,
    pub dataset_id: &'a str,
}

impl<'a> DispatchPayload<'a> {
    pub fn new(feed: &'a FeedRecord, dataset_id: &'a str) -> Self {
        Self { feed, dataset_id }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Acknowledgement from the job runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchAck {
    pub status_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Trait for ingestion job runners.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Fire-and-forget invocation of `job_name`.
    async fn invoke(&self, job_name: &str, payload: &DispatchPayload<'_>) -> Result<DispatchAck>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_payload_shape() {
        let row = json!({
            ":id": "row-7",
            "feedname": "mdot",
            "active": true,
            "datafeed_frequency_update": "12h",
            "lastingestedtosandbox": "2021-03-04T12:00:00.000",
            "url": "https://example.com/feed"
        });
        let feed = FeedRecord::from_row(row.clone()).unwrap();

        let bytes = DispatchPayload::new(&feed, "abcd-1234").to_bytes().unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["dataset_id"], "abcd-1234");
        assert_eq!(value["feed"], row);
    }
}
