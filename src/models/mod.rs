// src/models/mod.rs

//! Domain models for the feed trigger.

mod config;
mod feed;
mod summary;

pub use config::{Config, DispatchConfig, OrchestratorConfig, RegistryConfig};
pub use feed::{FeedRecord, UnreadableRow, fields};
pub use summary::{FeedFailure, FeedOutcome, IngestionSummary, PlanEntry, Severity};
