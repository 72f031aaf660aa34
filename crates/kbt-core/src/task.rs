//! Transfer task: the state record for one resource's attempt sequence.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;

use crate::control::CancelToken;
use crate::progress::{self, ProgressEstimate, ProgressSample};

/// Opaque identifier of the resource being transferred.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

macro_rules! resource_id_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for ResourceId {
            fn from(n: $t) -> Self {
                Self(n.to_string())
            }
        })*
    };
}

resource_id_from_int!(u32, u64, i32, i64, usize);

/// Lifecycle state of a transfer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Idle,
    Requested,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }
}

/// Mutable state of one transfer. Private to the task that runs it; only the
/// cancel token is shared (with the registry).
#[derive(Debug)]
pub struct TransferTask {
    resource_id: ResourceId,
    state: TaskState,
    bytes_loaded: u64,
    bytes_total: Option<u64>,
    attempt: u32,
    started_at: Instant,
    last_sample_at: Instant,
    last_sample_bytes: u64,
    cancel_token: CancelToken,
    result_filename: Option<String>,
}

impl TransferTask {
    pub fn new(resource_id: ResourceId, cancel_token: CancelToken) -> Self {
        let now = Instant::now();
        Self {
            resource_id,
            state: TaskState::Idle,
            bytes_loaded: 0,
            bytes_total: None,
            attempt: 1,
            started_at: now,
            last_sample_at: now,
            last_sample_bytes: 0,
            cancel_token,
            result_filename: None,
        }
    }

    pub fn resource_id(&self) -> &ResourceId {
        &self.resource_id
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn bytes_loaded(&self) -> u64 {
        self.bytes_loaded
    }

    pub fn bytes_total(&self) -> Option<u64> {
        self.bytes_total
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel_token
    }

    pub fn result_filename(&self) -> Option<&str> {
        self.result_filename.as_deref()
    }

    /// Starts attempt number `attempt`. Progress restarts from zero: there is
    /// no partial resume between attempts.
    pub fn begin_attempt(&mut self, attempt: u32) {
        let now = Instant::now();
        self.attempt = attempt.max(1);
        self.state = TaskState::Requested;
        self.bytes_loaded = 0;
        self.bytes_total = None;
        self.started_at = now;
        self.last_sample_at = now;
        self.last_sample_bytes = 0;
    }

    /// Records a progress sample taken at `now`.
    ///
    /// Returns `None` (and changes nothing) if the sample would move
    /// `bytes_loaded` backwards.
    pub fn record_progress(
        &mut self,
        now: Instant,
        loaded: u64,
        total: Option<u64>,
    ) -> Option<ProgressEstimate> {
        if loaded < self.bytes_loaded || self.state.is_terminal() {
            return None;
        }
        if total.is_some() {
            self.bytes_total = total;
        }
        self.state = TaskState::InProgress;
        let previous = ProgressSample::new(self.last_sample_at, self.last_sample_bytes);
        let current = ProgressSample::new(now, loaded);
        let est = progress::estimate(previous, current, self.bytes_total);
        self.bytes_loaded = loaded;
        self.last_sample_at = now;
        self.last_sample_bytes = loaded;
        Some(est)
    }

    pub fn complete(&mut self, filename: String) {
        self.state = TaskState::Completed;
        self.result_filename = Some(filename);
    }

    pub fn fail(&mut self) {
        self.state = TaskState::Failed;
    }

    pub fn mark_cancelled(&mut self) {
        self.state = TaskState::Cancelled;
    }
}
