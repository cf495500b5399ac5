//! Pipeline entry points.
//!
//! - `ingest`: the orchestrator, one pass over all active feeds
//! - `plan`: dry-run evaluation
//! - `report`: progress reporting
//! - `app`: production wiring (feature `aws`)

#[cfg(feature = "aws")]
pub mod app;
pub mod ingest;
pub mod plan;
pub mod report;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(feature = "aws")]
pub use app::App;
pub use ingest::{IngestionOrchestrator, JobTarget};
pub use plan::plan_feed;
pub use report::{LogReporter, Reporter, log_plan};
