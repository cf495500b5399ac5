// src/lib.rs

//! Feed Trigger Library
//!
//! Polls a feed registry and dispatches an ingestion job for every feed whose
//! update frequency says it is due.

pub mod config;
pub mod dispatch;
pub mod error;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod services;
pub mod utils;
