//! Bounded retry with exponential backoff for task functions.
//!
//! ```rust,no_run
//! use cadence_tasks::retry::{run_with_retry, RetryPolicy};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! // 3 attempts, 2s after the first failure, 4s after the second.
//! let policy = RetryPolicy::new(3, 2, 2)?;
//! run_with_retry(Some(&policy), || async { std::fs::read("/tmp/input") }).await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// How many times to attempt an operation and how long to wait in between.
///
/// Serialised as the map `{"tries": n, "delay": secs, "backoff": factor}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RetryPolicyMap", into = "RetryPolicyMap")]
pub struct RetryPolicy {
    tries: u32,
    delay: u64,
    backoff: u32,
}

/// Wire/storage shape of a [`RetryPolicy`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RetryPolicyMap {
    tries: u32,
    delay: u64,
    backoff: u32,
}

/// A policy with zero tries would never run the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("retry policy needs at least one try (got {tries})")]
pub struct InvalidRetryPolicy {
    pub tries: u32,
}

/// Every attempt failed. Carries the error from the last attempt.
#[derive(Debug, Error)]
#[error("task failed after {attempts} attempts: {source}")]
pub struct RetryError<E> {
    pub attempts: u32,
    #[source]
    pub source: E,
}

impl RetryPolicy {
    /// `tries` total attempts; `delay` seconds before the second attempt;
    /// each later wait is the previous one multiplied by `backoff`.
    pub fn new(tries: u32, delay: u64, backoff: u32) -> Result<Self, InvalidRetryPolicy> {
        if tries == 0 {
            return Err(InvalidRetryPolicy { tries });
        }
        Ok(Self {
            tries,
            delay,
            backoff,
        })
    }

    pub fn tries(&self) -> u32 {
        self.tries
    }

    pub fn delay(&self) -> u64 {
        self.delay
    }

    pub fn backoff(&self) -> u32 {
        self.backoff
    }

    /// The waits between consecutive attempts, `tries - 1` of them.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let backoff = u64::from(self.backoff);
        std::iter::successors(Some(self.delay), move |d| Some(d.saturating_mul(backoff)))
            .take(self.tries.saturating_sub(1) as usize)
            .map(Duration::from_secs)
    }
}

impl TryFrom<RetryPolicyMap> for RetryPolicy {
    type Error = InvalidRetryPolicy;

    fn try_from(m: RetryPolicyMap) -> Result<Self, Self::Error> {
        RetryPolicy::new(m.tries, m.delay, m.backoff)
    }
}

impl From<RetryPolicy> for RetryPolicyMap {
    fn from(p: RetryPolicy) -> Self {
        Self {
            tries: p.tries,
            delay: p.delay,
            backoff: p.backoff,
        }
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// Without a policy `op` runs exactly once. Waiting between attempts is an
/// async sleep, so only the calling task is suspended.
pub async fn run_with_retry<T, E, F, Fut>(
    policy: Option<&RetryPolicy>,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let Some(policy) = policy else {
        return op().await.map_err(|source| RetryError {
            attempts: 1,
            source,
        });
    };

    let mut delays = policy.delays();
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let err = match op().await {
            Ok(value) => {
                debug!(attempt, "task attempt succeeded");
                return Ok(value);
            }
            Err(e) => e,
        };
        match delays.next() {
            Some(wait) => {
                warn!(
                    attempt,
                    tries = policy.tries,
                    retry_in_secs = wait.as_secs(),
                    error = %err,
                    "task attempt failed; retrying"
                );
                tokio::time::sleep(wait).await;
            }
            None => {
                return Err(RetryError {
                    attempts: attempt,
                    source: err,
                })
            }
        }
    }
}
