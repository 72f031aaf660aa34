//! Retry and backoff policy.
//!
//! This module encapsulates error classification (timeouts, connection
//! failures, server errors, rejections) and the fixed delay schedule used
//! between attempts, so that the transfer manager and the batch scheduler
//! share one consistent policy.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify_curl_error, classify_http_status};
pub use error::{FetchError, FetchErrorKind};
pub use policy::{RetryDecision, RetryPolicy};
pub use run::{wait_before_retry, WaitOutcome};
