//! Scheduling logic for the feed trigger.
//!
//! - Frequency parsing (`frequency`)
//! - Due-time arithmetic (`schedule`)
//! - Per-feed decisions (`evaluator`)

pub mod evaluator;
pub mod frequency;
pub mod schedule;

pub use evaluator::{IngestionDecision, evaluate};
pub use frequency::{FrequencyUnit, ParsedFrequency};
pub use schedule::{format_timestamp, next_eligible_instant, parse_timestamp};
