//! Bounded retry with a final attempt
//!
//! The [`ConvergenceLoop`] runs an attempt until it succeeds, fails fatally,
//! or the deadline passes. Each attempt classifies its own outcome as an
//! [`Attempt`]. Retries back off exponentially, and no sleep runs past the
//! deadline.
//!
//! Execution has two phases:
//!
//! 1. [`ConvergenceLoop::retry_until`] retries within the budget.
//! 2. If that times out, [`ConvergenceLoop::run_until`] makes exactly one
//!    more attempt before giving up.
//!
//! Timing uses `tokio::time`, so tests can drive multi-minute budgets with
//! a paused clock.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::config::{BackoffConfig, MAX_TIMEOUT};

/// The instant `timeout` from now
///
/// Saturates at [`MAX_TIMEOUT`] instead of overflowing the clock.
pub fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(MAX_TIMEOUT))
        .unwrap_or(now)
}

/// Outcome of one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T, E> {
    /// Succeeded with a value
    Done(T),
    /// Failed transiently; try again
    Retry(E),
    /// Failed permanently; stop
    Fail(E),
}

/// Why a convergence loop gave up
#[derive(Debug, Error)]
pub enum ConvergenceError<E> {
    /// An attempt failed permanently
    #[error("{0}")]
    Fatal(E),

    /// The budget ran out while attempts kept failing transiently
    #[error("timed out after {attempts} attempts: {last_error}")]
    TimedOut { last_error: E, attempts: u32 },
}

impl<E> ConvergenceError<E> {
    /// The error carried by either variant
    pub fn into_inner(self) -> E {
        match self {
            ConvergenceError::Fatal(e) => e,
            ConvergenceError::TimedOut { last_error, .. } => last_error,
        }
    }

    /// Check if the budget ran out
    pub fn is_timeout(&self) -> bool {
        matches!(self, ConvergenceError::TimedOut { .. })
    }
}

/// Bounded-retry executor
#[derive(Debug, Clone, Default)]
pub struct ConvergenceLoop {
    backoff: BackoffConfig,
}

impl ConvergenceLoop {
    /// Create a loop with the given backoff
    pub fn new(backoff: BackoffConfig) -> Self {
        Self { backoff }
    }

    /// The backoff between attempts
    pub fn backoff(&self) -> &BackoffConfig {
        &self.backoff
    }

    /// Run `attempt` with a budget of `timeout` starting now
    pub async fn run<T, E, F, Fut>(
        &self,
        timeout: Duration,
        attempt: F,
    ) -> Result<T, ConvergenceError<E>>
    where
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Attempt<T, E>>,
    {
        self.run_until(deadline_after(timeout), attempt).await
    }

    /// Retry until `deadline`, then make one final attempt if still failing
    pub async fn run_until<T, E, F, Fut>(
        &self,
        deadline: Instant,
        mut attempt: F,
    ) -> Result<T, ConvergenceError<E>>
    where
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Attempt<T, E>>,
    {
        let attempts = match self.retry_until(deadline, &mut attempt).await {
            Err(ConvergenceError::TimedOut {
                last_error,
                attempts,
            }) => {
                warn!(attempts, error = %last_error, "Retry budget exhausted, making final attempt");
                attempts
            }
            other => return other,
        };

        match attempt().await {
            Attempt::Done(value) => Ok(value),
            Attempt::Fail(e) => Err(ConvergenceError::Fatal(e)),
            Attempt::Retry(e) => Err(ConvergenceError::TimedOut {
                last_error: e,
                attempts: attempts + 1,
            }),
        }
    }

    /// Retry `attempt` until it resolves or `deadline` passes
    ///
    /// Always makes at least one attempt, even if the deadline has already
    /// passed.
    pub async fn retry_until<T, E, F, Fut>(
        &self,
        deadline: Instant,
        mut attempt: F,
    ) -> Result<T, ConvergenceError<E>>
    where
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Attempt<T, E>>,
    {
        let mut delay = self.backoff.initial_delay;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let last_error = match attempt().await {
                Attempt::Done(value) => return Ok(value),
                Attempt::Fail(e) => return Err(ConvergenceError::Fatal(e)),
                Attempt::Retry(e) => e,
            };

            let now = Instant::now();
            if now >= deadline {
                return Err(ConvergenceError::TimedOut {
                    last_error,
                    attempts,
                });
            }

            let wait = delay.min(deadline - now);
            debug!(
                attempt = attempts,
                error = %last_error,
                wait_ms = wait.as_millis() as u64,
                "Retryable failure"
            );
            sleep(wait).await;
            delay = self.backoff.next_delay(delay);

            if Instant::now() >= deadline {
                return Err(ConvergenceError::TimedOut {
                    last_error,
                    attempts,
                });
            }
        }
    }
}
