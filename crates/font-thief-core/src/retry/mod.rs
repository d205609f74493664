//! Retry and backoff for font downloads.
//!
//! Only download failures are retried: timeouts, connection failures,
//! throttling and 5xx. Everything else fails the asset on the first attempt.

mod classify;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
