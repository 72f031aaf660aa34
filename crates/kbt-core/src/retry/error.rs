//! Per-attempt fetch error type for retry classification.

use serde::Serialize;
use std::fmt;

/// High-level classification of a failed fetch attempt.
///
/// Transports map their own failures (curl errors, HTTP status codes,
/// filesystem errors) into these kinds; the retry policy only looks at this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// Attempt exceeded its timeout.
    Timeout,
    /// Network-level failure (connection refused/reset, DNS, short read).
    Connection,
    /// Server-side failure worth retrying (5xx, 429, 408).
    Server(u16),
    /// Server refused the request (e.g. 403, 404). Not retried.
    Rejected(u16),
    /// The transport observed the cancellation signal and aborted.
    Cancelled,
}

impl FetchErrorKind {
    /// True for kinds the retry policy re-attempts.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            FetchErrorKind::Timeout | FetchErrorKind::Connection | FetchErrorKind::Server(_)
        )
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::Timeout => write!(f, "timed out"),
            FetchErrorKind::Connection => write!(f, "connection failed"),
            FetchErrorKind::Server(code) => write!(f, "server error (HTTP {})", code),
            FetchErrorKind::Rejected(code) => write!(f, "rejected (HTTP {})", code),
            FetchErrorKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Error returned by a single fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(after: std::time::Duration) -> Self {
        Self::new(
            FetchErrorKind::Timeout,
            format!("no response within {} ms", after.as_millis()),
        )
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Connection, message)
    }

    pub fn cancelled() -> Self {
        Self::new(FetchErrorKind::Cancelled, "transfer aborted")
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for FetchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_kinds() {
        assert!(FetchErrorKind::Timeout.is_transient());
        assert!(FetchErrorKind::Connection.is_transient());
        assert!(FetchErrorKind::Server(502).is_transient());
        assert!(!FetchErrorKind::Rejected(404).is_transient());
        assert!(!FetchErrorKind::Cancelled.is_transient());
    }

    #[test]
    fn timeout_and_connection_display_differently() {
        let t = FetchError::timeout(std::time::Duration::from_millis(1500));
        let c = FetchError::connection("reset by peer");
        assert_eq!(t.to_string(), "timed out: no response within 1500 ms");
        assert_eq!(c.to_string(), "connection failed: reset by peer");
    }
}
