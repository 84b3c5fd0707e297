//! Bounded polling for asynchronous provisioning
//!
//! Certificate issuance and distribution deployment complete in the
//! background. A [`Waiter`] sleeps a fixed interval, asks a check for the
//! current status, and stops on a terminal state, after a bounded number
//! of attempts, at an optional deadline, or when cancelled.

use crate::error::{CloudError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Interval and bound for one kind of wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Sleep before every status check
    pub interval: Duration,

    /// Maximum number of status checks
    pub max_attempts: u32,

    /// Log a progress line every N pending checks (0 disables)
    pub progress_every: u32,
}

impl WaitPolicy {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            progress_every: 0,
        }
    }

    pub const fn with_progress_every(mut self, every: u32) -> Self {
        self.progress_every = every;
        self
    }

    /// Longest time this policy can wait
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Result of a single status check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check<T> {
    /// Terminal success
    Ready(T),
    /// Not there yet; carries the observed status for progress output
    Pending(String),
}

/// Polling driver shared by every wait in a run
#[derive(Debug, Clone)]
pub struct Waiter {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

impl Waiter {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Give up every wait once this instant has passed
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Poll `check` under `policy` until it reports [`Check::Ready`]
    ///
    /// Errors returned by the check end the wait immediately; terminal
    /// failure states are expected to be reported that way.
    pub async fn wait<T, F, Fut>(&self, what: &str, policy: &WaitPolicy, mut check: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Check<T>>>,
    {
        for attempt in 1..=policy.max_attempts {
            self.sleep(what, policy.interval, attempt - 1).await?;

            match check().await? {
                Check::Ready(value) => {
                    tracing::debug!("{} ready after {} checks", what, attempt);
                    return Ok(value);
                }
                Check::Pending(status) => {
                    if policy.progress_every > 0 && attempt % policy.progress_every == 0 {
                        tracing::info!(
                            "Still waiting for {} (status: {}, check {}/{})",
                            what,
                            status,
                            attempt,
                            policy.max_attempts
                        );
                    } else {
                        tracing::debug!("{} pending: {}", what, status);
                    }
                }
            }
        }

        Err(CloudError::Timeout {
            what: what.to_string(),
            attempts: policy.max_attempts,
        })
    }

    async fn sleep(&self, what: &str, interval: Duration, attempts_so_far: u32) -> Result<()> {
        let wake = Instant::now() + interval;
        if let Some(deadline) = self.deadline
            && wake > deadline
        {
            return Err(CloudError::Timeout {
                what: what.to_string(),
                attempts: attempts_so_far,
            });
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CloudError::Cancelled(what.to_string())),
            _ = tokio::time::sleep_until(wake) => Ok(()),
        }
    }
}
