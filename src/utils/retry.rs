// src/utils/retry.rs

//! Bounded retry for transient transport failures.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;
use crate::models::RegistryConfig;

/// Fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }

    pub fn from_registry_config(config: &RegistryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Run `op` until it succeeds, fails permanently, or retries run out.
///
/// Only errors for which [`AppError::is_transient`](crate::error::AppError::is_transient)
/// holds are retried.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                log::warn!(
                    "{} failed ({}), retry {}/{} in {:?}",
                    label,
                    e,
                    attempt,
                    policy.max_retries,
                    policy.delay
                );
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
            }
            Err(e) => return Err(e),
        }
    }
}
