//! Waiting for page elements.
//!
//! Every wait races two cancellable waiters: an in-page insertion watch and a
//! fallback poll doing one-shot queries at a fixed cadence. The first to see
//! a target wins; the other is torn down before [`wait_for_any`] returns, so
//! it can no longer act.

use crate::backend::Backend;
use hirebot_common::protocol::{Target, WatchId};
use serde::{Deserialize, Serialize};
use std::future::pending;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Which waiter saw the target first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    Observer,
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Found {
    /// Index into the targets passed to [`wait_for_any`].
    pub target: usize,
    pub strategy: Strategy,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WaitError {
    #[error("wait cancelled")]
    Cancelled,
    #[error("target not found after {attempts} polls")]
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitPolicy {
    pub cadence: Duration,
    /// Fallback polls before giving up; `None` polls forever.
    pub max_attempts: Option<u32>,
    pub backoff_factor: f64,
    pub max_cadence: Duration,
}

impl WaitPolicy {
    pub fn fixed(cadence: Duration) -> Self {
        Self {
            cadence,
            max_attempts: None,
            backoff_factor: 1.0,
            max_cadence: cadence,
        }
    }

    /// Delay before fallback poll number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        if self.backoff_factor <= 1.0 || !self.backoff_factor.is_finite() {
            return self.cadence;
        }
        let base = self.cadence.as_nanos() as f64;
        let cap = self.max_cadence.as_nanos() as f64;
        let scaled = (base * self.backoff_factor.powi(attempt.min(64) as i32)).min(cap);
        Duration::from_nanos(scaled.max(base).round() as u64)
    }
}

/// Waits until any of `targets` is present.
pub async fn wait_for_any<B: Backend + ?Sized>(
    backend: &B,
    targets: &[Target],
    policy: &WaitPolicy,
    cancel: &CancellationToken,
) -> Result<Found, WaitError> {
    if cancel.is_cancelled() {
        return Err(WaitError::Cancelled);
    }

    let watch = match backend.arm_watch(targets).await {
        Ok(id) => Some(id),
        Err(e) => {
            debug!("Could not arm watch, relying on polling: {}", e);
            None
        }
    };

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WaitError::Cancelled),
        target = observe(backend, watch) => Ok(Found { target, strategy: Strategy::Observer }),
        result = poll(backend, targets, policy, cancel) => {
            result.map(|target| Found { target, strategy: Strategy::Poll })
        }
    };

    if let Some(id) = watch {
        if let Err(e) = backend.disarm_watch(id).await {
            debug!("Failed to disarm {}: {}", id, e);
        }
    }
    outcome
}

/// Resolves when the watch fires. A dead or disarmed watch never resolves,
/// leaving the race to the poller.
async fn observe<B: Backend + ?Sized>(backend: &B, watch: Option<WatchId>) -> usize {
    let Some(id) = watch else {
        return pending().await;
    };
    match backend.await_watch(id).await {
        Ok(Some(index)) => index,
        Ok(None) => pending().await,
        Err(e) => {
            debug!("{} lost: {}", id, e);
            pending().await
        }
    }
}

async fn poll<B: Backend + ?Sized>(
    backend: &B,
    targets: &[Target],
    policy: &WaitPolicy,
    cancel: &CancellationToken,
) -> Result<usize, WaitError> {
    let mut attempt = 0u32;
    loop {
        tokio::time::sleep(policy.delay(attempt)).await;
        if cancel.is_cancelled() {
            return Err(WaitError::Cancelled);
        }
        attempt += 1;

        for (index, target) in targets.iter().enumerate() {
            match backend.query(target).await {
                Ok(found) if !found.is_empty() => return Ok(index),
                Ok(_) => {}
                Err(e) => debug!("Poll query for {} failed: {}", target, e),
            }
        }

        if policy.max_attempts.is_some_and(|max| attempt >= max) {
            return Err(WaitError::Exhausted { attempts: attempt });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_policy_keeps_cadence() {
        let policy = WaitPolicy::fixed(Duration::from_millis(200));
        assert_eq!(policy.delay(0), Duration::from_millis(200));
        assert_eq!(policy.delay(10), Duration::from_millis(200));
    }

    #[test]
    fn backoff_grows_until_cap() {
        let policy = WaitPolicy {
            cadence: Duration::from_millis(100),
            max_attempts: None,
            backoff_factor: 2.0,
            max_cadence: Duration::from_millis(500),
        };
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
        assert_eq!(policy.delay(3), Duration::from_millis(500));
        assert_eq!(policy.delay(30), Duration::from_millis(500));
    }
}
