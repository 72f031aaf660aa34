//! Cancellable wait between attempts.

use std::time::Duration;

use crate::control::CancelToken;

/// How the wait before a re-attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Delay elapsed; the next attempt may start.
    Elapsed,
    /// The task was cancelled while waiting; no further attempt may start.
    Cancelled,
}

/// Sleeps for `delay` unless `token` is cancelled first.
///
/// A token that is already cancelled returns immediately, even for a zero delay.
pub async fn wait_before_retry(delay: Duration, token: &CancelToken) -> WaitOutcome {
    if token.is_cancelled() {
        return WaitOutcome::Cancelled;
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => WaitOutcome::Cancelled,
        _ = tokio::time::sleep(delay) => WaitOutcome::Elapsed,
    }
}
