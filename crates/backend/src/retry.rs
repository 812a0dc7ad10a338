// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded retry with exponential backoff
//!
//! Transient backend errors (timeouts, 5xx, quota) are retried up to a
//! budget; everything else surfaces immediately. Each attempt runs under
//! the policy's per-call timeout.

use crate::error::{BackendError, BackendResult};
use std::future::Future;
use std::time::Duration;

/// Retry budget and per-call timeout for backend operations.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            call_timeout: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Policy that gives up immediately; used by tests and local backends.
    pub fn none() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }
}

/// Run `op` under the policy, retrying transient failures with backoff.
pub async fn call<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> BackendResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = BackendResult<T>>,
{
    let mut delay = policy.base_delay;
    let mut attempt = 0;
    loop {
        attempt += 1;
        let result = match tokio::time::timeout(policy.call_timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(policy.call_timeout)),
        };
        match result {
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                tracing::warn!(attempt, error = %err, "transient backend error, retrying");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(policy.max_delay);
            }
            other => return other,
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
