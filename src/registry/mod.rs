//! Feed registry abstractions.
//!
//! The orchestrator only sees the [`FeedRegistry`] trait: list the active
//! feeds, write one record back. [`SocrataRegistry`] is the production
//! implementation.

pub mod schema;
pub mod socrata;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::models::{FeedRecord, UnreadableRow};

pub use schema::{ColumnMeta, CoercionTable, FieldType, RegistrySchema};
pub use socrata::SocrataRegistry;

/// Acknowledgement of a record update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateAck {
    pub rows_updated: u64,
    pub rows_created: u64,
}

/// Snapshot of the active feeds.
///
/// Rows that could not be read are kept apart so the run can still count and
/// report them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveFeeds {
    pub feeds: Vec<FeedRecord>,
    pub unreadable: Vec<UnreadableRow>,
}

impl ActiveFeeds {
    /// Read raw registry rows, setting aside those that do not parse.
    pub fn from_rows(rows: impl IntoIterator<Item = Value>) -> Self {
        let mut snapshot = Self::default();
        for row in rows {
            snapshot.push_row(row);
        }
        snapshot
    }

    pub fn push_row(&mut self, row: Value) {
        match FeedRecord::deserialize(&row) {
            Ok(feed) => self.feeds.push(feed),
            Err(e) => {
                let unreadable = UnreadableRow::new(&row, e);
                log::error!(
                    "Unreadable registry row {}: {}",
                    unreadable.name(),
                    unreadable.message
                );
                self.unreadable.push(unreadable);
            }
        }
    }

    /// Number of active rows, readable or not.
    pub fn len(&self) -> usize {
        self.feeds.len() + self.unreadable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trait for feed registry backends.
#[async_trait]
pub trait FeedRegistry: Send + Sync {
    /// Snapshot of all feeds with `active = true`, in registry order.
    async fn list_active(&self) -> Result<ActiveFeeds>;

    /// Persist a record, keyed by its row id, preserving all other fields.
    async fn update(&self, feed: &FeedRecord) -> Result<UpdateAck>;

    /// Where the registry lives, for log messages.
    fn location(&self) -> String;
}
