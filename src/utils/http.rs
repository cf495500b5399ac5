// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::StatusCode;

use crate::error::{AppError, Result};
use crate::models::RegistryConfig;

/// Create a configured asynchronous HTTP client for registry calls.
pub fn create_client(config: &RegistryConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Whether a status code signals a condition worth retrying.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Map a transport-level failure.
///
/// Connection problems and timeouts become `RegistryUnavailable`; anything else
/// (body decoding, redirects) goes through `permanent`.
pub fn classify_transport_error(
    error: reqwest::Error,
    permanent: fn(String) -> AppError,
) -> AppError {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        AppError::RegistryUnavailable(error.to_string())
    } else {
        permanent(error.to_string())
    }
}

/// Map a non-success HTTP status.
pub fn classify_status(
    status: StatusCode,
    body: &str,
    permanent: fn(String) -> AppError,
) -> AppError {
    let body = body.trim();
    let detail = if body.len() > 300 {
        format!("HTTP {status}: {}...", truncate(body, 300))
    } else if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    };

    if is_retryable_status(status) {
        AppError::RegistryUnavailable(detail)
    } else {
        permanent(detail)
    }
}

fn truncate(s: &str, max_bytes: usize) -> &str {
    let mut end = max_bytes.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
