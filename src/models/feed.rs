//! Feed registry record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::services::schedule::format_timestamp;

/// Wire names of the registry columns this crate reads or writes.
pub mod fields {
    /// Socrata system row identifier, used as the upsert key
    pub const ROW_ID: &str = ":id";
    pub const FEED_NAME: &str = "feedname";
    pub const ACTIVE: &str = "active";
    pub const UPDATE_FREQUENCY: &str = "datafeed_frequency_update";
    pub const LAST_INGESTED: &str = "lastingestedtosandbox";
}

/// One row of the feed registry.
///
/// Only the fields the scheduler needs are typed. Everything else the registry
/// returns lands in `extra` and is serialized back unchanged, so a
/// read-modify-write cycle never drops columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRecord {
    /// Opaque system row id
    #[serde(
        rename = ":id",
        default,
        deserialize_with = "de::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub row_id: Option<String>,

    /// Human-readable feed name
    #[serde(
        rename = "feedname",
        default,
        deserialize_with = "de::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub feed_name: Option<String>,

    /// Whether the feed participates in scheduling
    #[serde(default, deserialize_with = "de::checkbox")]
    pub active: bool,

    /// Update frequency, e.g. `12h`, `5m`, `30s`
    #[serde(
        rename = "datafeed_frequency_update",
        default,
        deserialize_with = "de::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub update_frequency: Option<String>,

    /// ISO-8601 timestamp of the last triggered ingestion
    #[serde(
        rename = "lastingestedtosandbox",
        default,
        deserialize_with = "de::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_ingested: Option<String>,

    /// All remaining dataset-defined and system fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeedRecord {
    /// Create a record with the scheduling fields set and no extra columns.
    pub fn new(feed_name: impl Into<String>, update_frequency: impl Into<String>) -> Self {
        Self {
            row_id: None,
            feed_name: Some(feed_name.into()),
            active: true,
            update_frequency: Some(update_frequency.into()),
            last_ingested: None,
            extra: Map::new(),
        }
    }

    /// Name used in logs and summaries.
    ///
    /// Falls back to the row id when the registry row has no name.
    pub fn name(&self) -> &str {
        self.feed_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.row_id.as_deref())
            .unwrap_or("<unnamed>")
    }

    /// The last-ingested timestamp, treating blank values as absent.
    pub fn last_ingested(&self) -> Option<&str> {
        self.last_ingested
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Stamp the record as ingested at `at`.
    ///
    /// This is the only field the scheduler ever changes.
    pub fn mark_ingested(&mut self, at: DateTime<Utc>) {
        self.last_ingested = Some(format_timestamp(at));
    }

    /// Parse a record from a raw registry row.
    pub fn from_row(row: Value) -> serde_json::Result<Self> {
        serde_json::from_value(row)
    }

    /// Convert back to a raw registry row.
    pub fn to_row(&self) -> serde_json::Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(serde::ser::Error::custom(format!(
                "feed record serialized to non-object {other}"
            ))),
        }
    }
}

/// A registry row that could not be read as a [`FeedRecord`].
///
/// Identifying fields are salvaged when they are plain strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableRow {
    pub row_id: Option<String>,
    pub feed_name: Option<String>,
    pub message: String,
}

impl UnreadableRow {
    pub fn new(row: &Value, error: impl std::fmt::Display) -> Self {
        let text = |key: &str| row.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            row_id: text(fields::ROW_ID),
            feed_name: text(fields::FEED_NAME),
            message: error.to_string(),
        }
    }

    /// Name used in logs and summaries, falling back like [`FeedRecord::name`].
    pub fn name(&self) -> &str {
        self.feed_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.row_id.as_deref())
            .unwrap_or("<unnamed>")
    }
}

mod de {
    use super::*;

    /// Accept a string, number, bool or null and keep it as text.
    pub fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(other) => Err(serde::de::Error::custom(format!(
                "expected text, found {other}"
            ))),
        }
    }

    /// Socrata checkbox columns arrive as JSON booleans or `"true"`/`"false"`.
    pub fn checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(b)) => Ok(b),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" | "" => Ok(false),
                _ => Err(serde::de::Error::custom(format!(
                    "expected checkbox value, found {s:?}"
                ))),
            },
            Some(other) => Err(serde::de::Error::custom(format!(
                "expected checkbox value, found {other}"
            ))),
        }
    }
}
