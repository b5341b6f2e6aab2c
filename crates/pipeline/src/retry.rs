//! Whole-pipeline retry with linear backoff.
//!
//! [`with_retry`] re-invokes the operation from the start after each
//! transient failure, waiting `attempt * backoff_unit` in between (see
//! [`RetryPolicy`]). Re-running a partially successful pipeline creates
//! the earlier resources again, so the resources left behind by every
//! failed attempt are collected and handed back to the caller.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use adgen_core::retry::{AttemptState, RetryPolicy};
use adgen_core::steps::CreatedResource;

use crate::error::{PipelineError, PipelineFailure};

// ---------------------------------------------------------------------------
// Sleeper
// ---------------------------------------------------------------------------

/// Waits out a backoff delay.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Sleeps on the Tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Records requested delays and returns immediately.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order.
    pub async fn delays(&self) -> Vec<Duration> {
        self.delays.lock().await.clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().await.push(delay);
    }
}

// ---------------------------------------------------------------------------
// Retryable
// ---------------------------------------------------------------------------

/// Errors the retry loop can classify.
pub trait Retryable: fmt::Display {
    fn is_transient(&self) -> bool;

    /// Remote resources the failed attempt created.
    fn orphans(&self) -> &[CreatedResource] {
        &[]
    }
}

impl Retryable for PipelineError {
    fn is_transient(&self) -> bool {
        PipelineError::is_transient(self)
    }
}

impl Retryable for PipelineFailure {
    fn is_transient(&self) -> bool {
        self.error.is_transient()
    }

    fn orphans(&self) -> &[CreatedResource] {
        &self.created
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Successful result of [`with_retry`].
#[derive(Debug, Clone, PartialEq)]
pub struct Retried<T> {
    pub value: T,
    /// 1-based attempt that succeeded.
    pub attempts: u32,
    /// Resources left behind by earlier failed attempts.
    pub orphaned: Vec<CreatedResource>,
}

/// Terminal failure of [`with_retry`].
#[derive(Debug, thiserror::Error)]
#[error("{error} (after {attempts} attempt(s))")]
pub struct RetryError<E: std::error::Error + 'static> {
    #[source]
    pub error: E,
    pub attempts: u32,
    /// Resources left behind by every failed attempt, including the last.
    pub orphaned: Vec<CreatedResource>,
}

/// Run `op` under `policy`. `op` receives the 1-based attempt number.
///
/// Permanent errors and exhausted budgets end the loop immediately.
/// Cancelling `cancel` during a backoff ends it with the last error.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<Retried<T>, RetryError<E>>
where
    E: Retryable + std::error::Error + 'static,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut orphaned = Vec::new();
    let mut attempt = 1;

    loop {
        let error = match op(attempt).await {
            Ok(value) => {
                return Ok(Retried {
                    value,
                    attempts: attempt,
                    orphaned,
                })
            }
            Err(e) => e,
        };

        orphaned.extend_from_slice(error.orphans());

        match policy.after_failure(attempt, error.is_transient()) {
            AttemptState::Backoff(delay) => {
                tracing::warn!(
                    attempt,
                    max_attempts = policy.attempts(),
                    delay_secs = delay.as_secs(),
                    error = %error,
                    "Transient failure, retrying from the first step",
                );

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::warn!(attempt, "Retry cancelled during backoff");
                        return Err(RetryError { error, attempts: attempt, orphaned });
                    }
                    _ = sleeper.sleep(delay) => {}
                }

                attempt += 1;
            }
            state => {
                tracing::error!(
                    attempt,
                    transient = error.is_transient(),
                    state = ?state,
                    error = %error,
                    "Pipeline failed",
                );
                return Err(RetryError {
                    error,
                    attempts: attempt,
                    orphaned,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use adgen_core::steps::Step;

    use super::*;

    fn transient() -> PipelineError {
        PipelineError::Timeout {
            step: Step::Campaign,
            after: Duration::from_secs(1),
        }
    }

    fn permanent() -> PipelineError {
        PipelineError::Validation("bad".into())
    }

    #[tokio::test]
    async fn succeeds_after_two_transient_failures() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);

        let result = with_retry(
            &RetryPolicy::default(),
            &sleeper,
            &CancellationToken::new(),
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(transient())
                    } else {
                        Ok("done")
                    }
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(result.value, "done");
        assert_eq!(result.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            sleeper.delays().await,
            vec![Duration::from_secs(5), Duration::from_secs(10)]
        );
    }

    #[tokio::test]
    async fn permanent_error_is_not_retried() {
        let sleeper = RecordingSleeper::new();

        let err = with_retry(
            &RetryPolicy::default(),
            &sleeper,
            &CancellationToken::new(),
            |_| async { Err::<(), _>(permanent()) },
        )
        .await
        .unwrap_err();

        assert_eq!(err.attempts, 1);
        assert!(sleeper.delays().await.is_empty());
    }

    #[tokio::test]
    async fn cancelled_backoff_stops_loop() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = AtomicU32::new(0);

        let err = with_retry(&RetryPolicy::default(), &TokioSleeper, &cancel, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(transient()) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
