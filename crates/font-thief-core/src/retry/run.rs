//! Async retry loop around a fallible download attempt.

use super::classify;
use super::policy::{RetryDecision, RetryPolicy};
use crate::control::RunControl;
use crate::fetch::FetchError;
use std::future::Future;

/// Runs `attempt` until it succeeds, the policy gives up, or the run is
/// cancelled. Backoff sleeps are interrupted by cancellation.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    control: &RunControl,
    mut attempt: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut n = 1u32;
    loop {
        let err = match attempt(n).await {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        match policy.decide(n, classify::classify(&err)) {
            RetryDecision::NoRetry => return Err(err),
            RetryDecision::RetryAfter(delay) => {
                tracing::debug!(attempt = n, ?delay, "retrying after: {}", err);
                tokio::select! {
                    _ = control.cancelled() => return Err(FetchError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                n += 1;
            }
        }
    }
}
