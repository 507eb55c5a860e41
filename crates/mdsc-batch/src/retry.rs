//! Whole-run retry supervisor with capped exponential backoff.
//!
//! A failed run is re-executed from scratch; there is no partial resume.
//! Non-retryable errors (configuration, engine, malformed adapter data) are
//! returned immediately.

use std::future::Future;

use crate::config::RetryPolicy;
use crate::error::BatchError;

/// Run `attempt_fn` until it succeeds, fails fatally, or exhausts
/// `policy.max_retries` retries after the initial attempt.
///
/// `attempt_fn` receives the zero-based attempt number.
pub async fn supervise<T, F, Fut>(policy: &RetryPolicy, mut attempt_fn: F) -> Result<T, BatchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, BatchError>>,
{
    let mut attempt: u32 = 0;
    loop {
        metrics::counter!("mdsc_batch_attempts_total").increment(1);
        let err = match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retryable() {
            tracing::error!(attempt = attempt + 1, error = %err, "batch run failed with a fatal error");
            return Err(err);
        }
        if attempt >= policy.max_retries {
            tracing::error!(
                attempts = attempt + 1,
                max_retries = policy.max_retries,
                error = %err,
                "batch run failed, retries exhausted"
            );
            return Err(err);
        }

        let delay = policy.delay_for(attempt);
        tracing::warn!(
            attempt = attempt + 1,
            max_retries = policy.max_retries,
            "batch run failed, retrying in {delay:?}: {err}"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
