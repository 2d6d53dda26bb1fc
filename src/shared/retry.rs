//! Bounded retry with exponential backoff, plus cooperative cancellation.
//!
//! Backoff waits are `tokio::time::sleep`: only the calling task is suspended,
//! and every invocation owns its own timer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::{RetryError, ServiceFailure};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Always >= 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Wait before the retry that follows failed attempt `attempt_index` (0-based):
    /// `base_delay * 2^attempt_index`.
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt_index))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        )
    }
}

/// Cancellation observed by [`RetryingCaller`]: an explicit signal, a deadline, or both.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    signal: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// Never fires.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn at_deadline(deadline: Instant) -> Self {
        Self {
            signal: None,
            deadline: Some(deadline),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        let signalled = self.signal.as_ref().is_some_and(|rx| *rx.borrow());
        let expired = self.deadline.is_some_and(|at| at <= Instant::now());
        signalled || expired
    }

    /// Resolves once the signal fires or the deadline passes; pends forever otherwise.
    pub async fn cancelled(&self) {
        let signal = async {
            match &self.signal {
                Some(rx) => {
                    let mut rx = rx.clone();
                    // Sender dropped without cancelling: nothing can fire any more.
                    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };
        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            _ = signal => {}
            _ = deadline => {}
        }
    }
}

/// Trigger side of a [`Cancellation`].
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn new() -> (Self, Cancellation) {
        let (tx, rx) = watch::channel(false);
        (
            Self { tx },
            Cancellation {
                signal: Some(rx),
                deadline: None,
            },
        )
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// One scheduled retry, reported to an observer before the backoff wait starts.
#[derive(Debug)]
pub struct RetryEvent<'a> {
    pub label: &'a str,
    /// Attempt that just failed (1-based).
    pub attempt: u32,
    pub delay: Duration,
    pub failure: &'a ServiceFailure,
}

pub type RetryObserver = Arc<dyn Fn(&RetryEvent<'_>) + Send + Sync>;

/// Runs one idempotent operation with bounded retries.
///
/// `Transient` and `Malformed` failures are retried with exponential backoff;
/// `Permanent` failures propagate at once without waiting.
#[derive(Clone, Default)]
pub struct RetryingCaller {
    policy: RetryPolicy,
    cancel: Cancellation,
    observer: Option<RetryObserver>,
}

impl RetryingCaller {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            cancel: Cancellation::none(),
            observer: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_observer(mut self, observer: RetryObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run `op` until it succeeds, fails permanently, exhausts the policy or is cancelled.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn call<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ServiceFailure>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(RetryError::Cancelled { attempts: attempt });
            }
            attempt += 1;

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(label, attempt, "cancelled while call in flight");
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
                r = op(attempt) => r,
            };

            let failure = match result {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(label, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(failure) => failure,
            };

            if !failure.is_retryable() {
                warn!(label, attempt, error = %failure, "non-retryable failure");
                return Err(RetryError::Rejected { attempt, failure });
            }
            if attempt >= max_attempts {
                warn!(label, attempts = attempt, error = %failure, "retries exhausted");
                return Err(RetryError::RetriesExhausted {
                    attempts: attempt,
                    last: failure,
                });
            }

            let delay = self.policy.delay_for(attempt - 1);
            debug!(
                label,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "retryable failure; backing off"
            );
            if let Some(observer) = &self.observer {
                observer(&RetryEvent {
                    label,
                    attempt,
                    delay,
                    failure: &failure,
                });
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(label, attempt, "cancelled during backoff");
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
