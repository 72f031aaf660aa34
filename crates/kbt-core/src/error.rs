//! Terminal transfer errors and the structured payload handed to callers.

use serde::Serialize;

use crate::retry::{FetchError, FetchErrorKind};
use crate::task::ResourceId;

/// Why a transfer (or a batch) ended without a saved file.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// A transfer for this resource is already running. Informational.
    #[error("{resource_id} is already downloading")]
    DuplicateInProgress { resource_id: ResourceId },

    /// Cancelled mid-transfer or while waiting to retry.
    #[error("transfer of {resource_id} was cancelled")]
    Cancelled { resource_id: ResourceId, attempts: u32 },

    /// Every allowed attempt failed with a transient error.
    #[error("transfer of {resource_id} failed after {attempts} attempt(s): {last}")]
    ExhaustedRetries {
        resource_id: ResourceId,
        attempts: u32,
        last: FetchError,
    },

    /// The server refused the request; retrying would not help.
    #[error("transfer of {resource_id} was rejected: {source}")]
    Rejected {
        resource_id: ResourceId,
        attempts: u32,
        #[source]
        source: FetchError,
    },

    /// The payload arrived but could not be saved.
    #[error("could not save {filename} for {resource_id}: {source}")]
    Persistence {
        resource_id: ResourceId,
        filename: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid batch configuration; nothing was started.
    #[error("invalid batch configuration: {0}")]
    SchedulerInput(String),
}

/// Flat error kind for UI decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DuplicateInProgress,
    Cancelled,
    ExhaustedRetries,
    Rejected,
    Persistence,
    SchedulerInput,
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::DuplicateInProgress { .. } => ErrorKind::DuplicateInProgress,
            TransferError::Cancelled { .. } => ErrorKind::Cancelled,
            TransferError::ExhaustedRetries { .. } => ErrorKind::ExhaustedRetries,
            TransferError::Rejected { .. } => ErrorKind::Rejected,
            TransferError::Persistence { .. } => ErrorKind::Persistence,
            TransferError::SchedulerInput(_) => ErrorKind::SchedulerInput,
        }
    }

    /// Attempts made before the error, when any were.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            TransferError::Cancelled { attempts, .. }
            | TransferError::ExhaustedRetries { attempts, .. }
            | TransferError::Rejected { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    pub fn resource_id(&self) -> Option<&ResourceId> {
        match self {
            TransferError::DuplicateInProgress { resource_id }
            | TransferError::Cancelled { resource_id, .. }
            | TransferError::ExhaustedRetries { resource_id, .. }
            | TransferError::Rejected { resource_id, .. }
            | TransferError::Persistence { resource_id, .. } => Some(resource_id),
            TransferError::SchedulerInput(_) => None,
        }
    }

    /// Whether UI should present this as a failure. Duplicates are a notice
    /// and cancellations are silent.
    pub fn is_user_visible_failure(&self) -> bool {
        !matches!(
            self,
            TransferError::DuplicateInProgress { .. } | TransferError::Cancelled { .. }
        )
    }

    /// Whether a manual [`retry`](crate::TransferManager::retry) makes sense.
    pub fn is_retryable_by_user(&self) -> bool {
        matches!(
            self,
            TransferError::ExhaustedRetries { .. } | TransferError::Persistence { .. }
        )
    }

    pub fn payload(&self) -> ErrorPayload {
        let fetch_kind = match self {
            TransferError::ExhaustedRetries { last, .. } => Some(last.kind),
            TransferError::Rejected { source, .. } => Some(source.kind),
            _ => None,
        };
        ErrorPayload {
            kind: self.kind(),
            attempts: self.attempts(),
            fetch_kind,
            message: self.to_string(),
        }
    }
}

/// Structured error payload delivered with `Failed` events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub attempts: Option<u32>,
    /// Underlying fetch failure (e.g. timed out vs. connection failed).
    pub fetch_kind: Option<FetchErrorKind>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_reports_attempts_and_cause() {
        let err = TransferError::ExhaustedRetries {
            resource_id: ResourceId::from(7u64),
            attempts: 2,
            last: FetchError::timeout(std::time::Duration::from_secs(5)),
        };
        assert_eq!(err.kind(), ErrorKind::ExhaustedRetries);
        assert_eq!(err.attempts(), Some(2));
        assert!(err.to_string().contains("after 2 attempt(s)"));
        let payload = err.payload();
        assert_eq!(payload.fetch_kind, Some(FetchErrorKind::Timeout));
        assert!(err.is_user_visible_failure());
        assert!(err.is_retryable_by_user());
    }

    #[test]
    fn duplicate_and_cancel_are_not_failures() {
        let dup = TransferError::DuplicateInProgress {
            resource_id: ResourceId::from("a"),
        };
        let cancelled = TransferError::Cancelled {
            resource_id: ResourceId::from("a"),
            attempts: 1,
        };
        assert!(!dup.is_user_visible_failure());
        assert!(!cancelled.is_user_visible_failure());
        assert_eq!(dup.attempts(), None);
        assert_eq!(cancelled.payload().kind, ErrorKind::Cancelled);
    }
}
