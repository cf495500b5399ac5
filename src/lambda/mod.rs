// src/lambda/mod.rs

//! AWS Lambda handler for the feed trigger.
//!
//! Each scheduled invocation performs one run:
//! 1. Lists the active feeds in the registry
//! 2. Dispatches the ingestion job for every due feed
//! 3. Stamps each dispatched feed in the registry
//!
//! Fatal errors fail the invocation so the scheduler records it; per-feed
//! failures are returned in the response.

use std::sync::Arc;

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::models::{IngestionSummary, PlanEntry};
use crate::pipeline::App;

/// Lambda invocation payload.
///
/// Scheduled events carry unrelated fields; they are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct TriggerRequest {
    /// Evaluate only, no dispatch or registry writes
    #[serde(default)]
    pub dry_run: bool,
}

/// Lambda response payload.
#[derive(Debug, Default, Serialize)]
pub struct TriggerResponse {
    /// Whether every feed was processed without failure
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<IngestionSummary>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<PlanEntry>>,

    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

/// Main Lambda handler function.
#[instrument(skip(app, event), fields(request_id = %event.context.request_id))]
pub async fn handler(
    app: Arc<App>,
    event: LambdaEvent<TriggerRequest>,
) -> std::result::Result<TriggerResponse, LambdaError> {
    let start = std::time::Instant::now();
    let (request, _context) = event.into_parts();

    info!("Starting run: dry_run={}", request.dry_run);

    let mut response = if request.dry_run {
        let plan = app.plan().await.map_err(|e| {
            error!("Plan failed: {}", e);
            e
        })?;
        TriggerResponse {
            success: plan.iter().all(|entry| entry.failure.is_none()),
            plan: Some(plan),
            ..Default::default()
        }
    } else {
        let summary = app.run().await.map_err(|e| {
            error!("Run failed: {}", e);
            e
        })?;
        TriggerResponse {
            success: summary.is_clean(),
            summary: Some(summary),
            ..Default::default()
        }
    };

    response.execution_time_ms = start.elapsed().as_millis() as u64;
    info!(
        "Run completed in {}ms, success={}",
        response.execution_time_ms, response.success
    );
    Ok(response)
}
