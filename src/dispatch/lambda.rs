//! AWS Lambda dispatcher.
//!
//! Jobs are invoked with `InvocationType::Event`, so Lambda queues the
//! payload and answers `202 Accepted` without waiting for the job.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_lambda::Client;
use aws_sdk_lambda::error::{DisplayErrorContext, SdkError};
use aws_sdk_lambda::operation::RequestId;
use aws_sdk_lambda::operation::invoke::InvokeError;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use std::time::Duration;

use crate::dispatch::{DispatchAck, DispatchPayload, Dispatcher};
use crate::error::{AppError, Result};
use crate::models::DispatchConfig;

/// Status Lambda returns for an accepted asynchronous invocation.
const ACCEPTED: i32 = 202;

/// Dispatcher that invokes a Lambda function asynchronously.
pub struct LambdaDispatcher {
    client: Client,
}

impl LambdaDispatcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a dispatcher from the ambient AWS configuration.
    ///
    /// Retries and the per-operation timeout come from `config`.
    pub async fn from_env(config: &DispatchConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(RetryConfig::standard().with_max_attempts(config.max_attempts.max(1)))
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(config.timeout_secs))
                    .build(),
            )
            .load()
            .await;

        Self::new(Client::new(&sdk_config))
    }
}

#[async_trait]
impl Dispatcher for LambdaDispatcher {
    async fn invoke(&self, job_name: &str, payload: &DispatchPayload<'_>) -> Result<DispatchAck> {
        let body = payload.to_bytes()?;

        let output = self
            .client
            .invoke()
            .function_name(job_name)
            .invocation_type(InvocationType::Event)
            .payload(Blob::new(body))
            .send()
            .await
            .map_err(|e| classify_invoke_error(&e))?;

        accept(output.status_code(), output.request_id())
    }
}

/// Check the invoke status code.
fn accept(status_code: i32, request_id: Option<&str>) -> Result<DispatchAck> {
    if status_code != ACCEPTED {
        return Err(AppError::DispatchRejected(format!(
            "expected status {ACCEPTED}, got {status_code}"
        )));
    }
    Ok(DispatchAck {
        status_code,
        request_id: request_id.map(str::to_string),
    })
}

/// Map an SDK error onto the dispatch error kinds.
///
/// Transport failures, throttling and service-side faults are
/// `DispatchUnavailable`; everything else (missing function, access denied,
/// bad request) is `DispatchRejected`.
fn classify_invoke_error<R>(error: &SdkError<InvokeError, R>) -> AppError
where
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(error).to_string();

    match error {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            AppError::DispatchUnavailable(message)
        }
        SdkError::ServiceError(context) => {
            let service_error = context.err();
            if service_error.is_too_many_requests_exception()
                || service_error.is_service_exception()
                || service_error.is_resource_not_ready_exception()
            {
                AppError::DispatchUnavailable(message)
            } else {
                AppError::DispatchRejected(message)
            }
        }
        _ => AppError::DispatchRejected(message),
    }
}
