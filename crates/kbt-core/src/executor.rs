//! One transfer attempt: fetch, track progress, name and save the payload.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::events::{EventSink, ProgressUpdate, TransferEvent};
use crate::retry::{FetchError, FetchErrorKind};
use crate::storage::Storage;
use crate::task::TransferTask;
use crate::transport::{FetchRequest, Fetcher, ProgressReporter};
use crate::url_model::derive_filename;

/// Result of a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTransfer {
    pub filename: String,
    /// Where the storage put it.
    pub path: PathBuf,
    pub bytes: u64,
    pub attempts: u32,
}

/// How a single attempt failed.
#[derive(Debug)]
pub enum AttemptError {
    /// The task's token fired; never retried.
    Cancelled,
    /// Fetch failed or timed out; the retry policy decides.
    Fetch(FetchError),
    /// Payload arrived but could not be saved; not retried.
    Persistence { filename: String, source: io::Error },
}

/// How long a timed-out transport gets to wind down after its attempt token
/// fires, so the next attempt does not overlap it.
const ABORT_GRACE: Duration = Duration::from_secs(5);

/// Runs attempts against a transport and a storage backend.
#[derive(Debug)]
pub struct Executor<F, S> {
    fetcher: F,
    storage: Arc<S>,
}

impl<F: Fetcher, S: Storage> Executor<F, S> {
    pub fn new(fetcher: F, storage: S) -> Self {
        Self {
            fetcher,
            storage: Arc::new(storage),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Runs the current attempt of `task`, bounded by `timeout`.
    ///
    /// Progress samples become `Progress` events; samples that would move
    /// the byte count backwards are dropped. Storage is called only when the
    /// fetch succeeded and the task was not cancelled.
    pub async fn execute(
        &self,
        task: &mut TransferTask,
        timeout: Duration,
        events: &mut dyn EventSink,
    ) -> Result<CompletedTransfer, AttemptError> {
        let resource_id = task.resource_id().clone();
        let token = task.cancel_token().clone();
        if token.is_cancelled() {
            return Err(AttemptError::Cancelled);
        }

        // Fires on task cancel and on this attempt's timeout.
        let attempt_token = token.child_token();
        let (progress, mut progress_rx) = ProgressReporter::channel();
        let request = FetchRequest {
            progress,
            cancel: Arc::new(attempt_token.clone()),
            timeout,
        };
        let fetch = self.fetcher.fetch(&resource_id, request);
        tokio::pin!(fetch);
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let outcome = loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(AttemptError::Cancelled),
                Some((loaded, total)) = progress_rx.recv() => {
                    record_progress(task, loaded, total, events);
                }
                res = &mut fetch => break res,
                _ = &mut deadline => {
                    tracing::debug!(%resource_id, attempt = task.attempt(), "attempt timed out");
                    attempt_token.cancel();
                    if tokio::time::timeout(ABORT_GRACE, &mut fetch).await.is_err() {
                        tracing::warn!(%resource_id, "transport ignored cancellation after timeout");
                    }
                    return Err(AttemptError::Fetch(FetchError::timeout(timeout)));
                }
            }
        };
        while let Ok((loaded, total)) = progress_rx.try_recv() {
            record_progress(task, loaded, total, events);
        }

        let fetched = match outcome {
            Ok(fetched) => fetched,
            Err(e) if e.kind == FetchErrorKind::Cancelled => return Err(AttemptError::Cancelled),
            Err(e) => return Err(AttemptError::Fetch(e)),
        };
        if token.is_cancelled() {
            return Err(AttemptError::Cancelled);
        }

        let bytes = fetched.payload.len() as u64;
        if task.bytes_loaded() < bytes {
            // Transport under-reported; close the bar at the real size.
            let total = task.bytes_total().map(|t| t.max(bytes)).or(Some(bytes));
            record_progress(task, bytes, total, events);
        }

        let filename = derive_filename(&resource_id, fetched.headers.get("content-disposition"));
        let path = self
            .save(fetched.payload, filename.clone())
            .await
            .map_err(|source| AttemptError::Persistence {
                filename: filename.clone(),
                source,
            })?;
        task.complete(filename.clone());

        Ok(CompletedTransfer {
            filename,
            path,
            bytes,
            attempts: task.attempt(),
        })
    }

    /// Runs the blocking save on tokio's blocking pool.
    async fn save(&self, payload: Vec<u8>, filename: String) -> io::Result<PathBuf> {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || storage.save(&payload, &filename))
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("save worker failed: {}", e)))?
    }
}

fn record_progress(
    task: &mut TransferTask,
    loaded: u64,
    total: Option<u64>,
    events: &mut dyn EventSink,
) {
    if let Some(estimate) = task.record_progress(Instant::now(), loaded, total) {
        events.emit(TransferEvent::Progress(ProgressUpdate {
            resource_id: task.resource_id().clone(),
            attempt: task.attempt(),
            bytes_loaded: task.bytes_loaded(),
            bytes_total: task.bytes_total(),
            estimate,
        }));
    }
}
