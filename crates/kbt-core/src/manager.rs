//! Transfer manager: the public entry point for single and batch transfers.
//!
//! A transfer is `registry.begin` → attempts (executor + retry policy) →
//! slot release → terminal event. The slot is released before the terminal
//! event goes out, so a caller reacting to `Succeeded` can start the same
//! resource again immediately.

use std::time::Duration;

use crate::control::TransferRegistry;
use crate::events::{EventSink, TransferEvent};
use crate::error::TransferError;
use crate::executor::{AttemptError, CompletedTransfer, Executor};
use crate::retry::{wait_before_retry, RetryDecision, RetryPolicy, WaitOutcome};
use crate::scheduler::{self, BatchOptions, BatchSummary};
use crate::storage::Storage;
use crate::task::{ResourceId, TransferTask};
use crate::transport::Fetcher;

/// Tunables for a manager.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSettings {
    pub retry_policy: RetryPolicy,
    /// Upper bound for each attempt.
    pub timeout: Duration,
    /// Default concurrency for batches.
    pub batch_concurrency: usize,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            retry_policy: RetryPolicy::default(),
            timeout: Duration::from_secs(300),
            batch_concurrency: 3,
        }
    }
}

/// Owns the registry, so independent managers never share state.
#[derive(Debug)]
pub struct TransferManager<F, S> {
    registry: TransferRegistry,
    executor: Executor<F, S>,
    settings: TransferSettings,
}

impl<F: Fetcher, S: Storage> TransferManager<F, S> {
    pub fn new(fetcher: F, storage: S, settings: TransferSettings) -> Self {
        Self {
            registry: TransferRegistry::new(),
            executor: Executor::new(fetcher, storage),
            settings,
        }
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    pub fn fetcher(&self) -> &F {
        self.executor.fetcher()
    }

    pub fn storage(&self) -> &S {
        self.executor.storage()
    }

    /// Transfers one resource with the configured policy and timeout.
    ///
    /// Returns [`TransferError::DuplicateInProgress`] at once, without
    /// emitting events, if the resource is already transferring.
    pub async fn start(
        &self,
        resource_id: impl Into<ResourceId>,
        events: &mut dyn EventSink,
    ) -> Result<CompletedTransfer, TransferError> {
        self.start_with_timeout(resource_id, events, self.settings.timeout)
            .await
    }

    /// Like [`start`](Self::start) with a per-call attempt timeout.
    pub async fn start_with_timeout(
        &self,
        resource_id: impl Into<ResourceId>,
        events: &mut dyn EventSink,
        timeout: Duration,
    ) -> Result<CompletedTransfer, TransferError> {
        self.run(resource_id.into(), &self.settings.retry_policy, timeout, events)
            .await
    }

    /// User-requested retry after a failure: a fresh task whose attempt
    /// counter starts again at 1, allowed `max_retries` automatic retries.
    pub async fn retry(
        &self,
        resource_id: impl Into<ResourceId>,
        events: &mut dyn EventSink,
        max_retries: u32,
    ) -> Result<CompletedTransfer, TransferError> {
        let policy = self.settings.retry_policy.with_max_retries(max_retries);
        self.run(resource_id.into(), &policy, self.settings.timeout, events)
            .await
    }

    /// Cancels the active transfer of `resource_id`. No-op when none is active.
    pub fn cancel(&self, resource_id: impl Into<ResourceId>) -> bool {
        self.registry.cancel(&resource_id.into())
    }

    /// Cancels every active transfer; returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        self.registry.cancel_all()
    }

    pub fn is_active(&self, resource_id: impl Into<ResourceId>) -> bool {
        self.registry.is_active(&resource_id.into())
    }

    pub fn list_active(&self) -> Vec<ResourceId> {
        self.registry.list_active()
    }

    /// Transfers many resources, at most `options.concurrency` at a time.
    pub async fn start_batch<I, T>(
        &self,
        resource_ids: I,
        options: BatchOptions<'_>,
    ) -> Result<BatchSummary, TransferError>
    where
        I: IntoIterator<Item = T>,
        T: Into<ResourceId>,
    {
        let ids: Vec<ResourceId> = resource_ids.into_iter().map(Into::into).collect();
        scheduler::run_batch(self, ids, &options).await
    }

    async fn run(
        &self,
        resource_id: ResourceId,
        policy: &RetryPolicy,
        timeout: Duration,
        events: &mut dyn EventSink,
    ) -> Result<CompletedTransfer, TransferError> {
        let (mut task, slot) = self.registry.begin(&resource_id)?;
        tracing::info!(%resource_id, max_attempts = policy.max_attempts(), "transfer started");
        events.emit(TransferEvent::Started {
            resource_id: resource_id.clone(),
        });

        let result = self.run_attempts(&mut task, policy, timeout, events).await;
        drop(slot);

        match &result {
            Ok(done) => {
                tracing::info!(
                    %resource_id,
                    filename = %done.filename,
                    bytes = done.bytes,
                    attempts = done.attempts,
                    last_attempt_ms = task.started_at().elapsed().as_millis() as u64,
                    "transfer completed"
                );
                events.emit(TransferEvent::Succeeded {
                    resource_id,
                    filename: done.filename.clone(),
                    path: done.path.clone(),
                    bytes: done.bytes,
                    attempts: done.attempts,
                });
            }
            Err(TransferError::Cancelled { attempts, .. }) => {
                tracing::info!(%resource_id, attempts, "transfer cancelled");
                events.emit(TransferEvent::Cancelled {
                    resource_id,
                    attempts: *attempts,
                });
            }
            Err(e) => {
                tracing::warn!(%resource_id, error = %e, "transfer failed");
                events.emit(TransferEvent::Failed {
                    resource_id,
                    error: e.payload(),
                });
            }
        }
        result
    }

    /// Attempts are strictly sequential; the task never exceeds
    /// `policy.max_attempts()`.
    async fn run_attempts(
        &self,
        task: &mut TransferTask,
        policy: &RetryPolicy,
        timeout: Duration,
        events: &mut dyn EventSink,
    ) -> Result<CompletedTransfer, TransferError> {
        let resource_id = task.resource_id().clone();
        let mut attempt = 1u32;
        loop {
            task.begin_attempt(attempt);
            tracing::debug!(%resource_id, attempt, "attempt started");

            let err = match self.executor.execute(task, timeout, events).await {
                Ok(done) => return Ok(done),
                Err(AttemptError::Cancelled) => {
                    task.mark_cancelled();
                    return Err(TransferError::Cancelled {
                        resource_id,
                        attempts: attempt,
                    });
                }
                Err(AttemptError::Persistence { filename, source }) => {
                    task.fail();
                    return Err(TransferError::Persistence {
                        resource_id,
                        filename,
                        source,
                    });
                }
                Err(AttemptError::Fetch(err)) => err,
            };

            match policy.decide(attempt, err.kind) {
                RetryDecision::NoRetry => {
                    task.fail();
                    return Err(if err.is_transient() {
                        TransferError::ExhaustedRetries {
                            resource_id,
                            attempts: attempt,
                            last: err,
                        }
                    } else {
                        TransferError::Rejected {
                            resource_id,
                            attempts: attempt,
                            source: err,
                        }
                    });
                }
                RetryDecision::RetryAfter(delay) => {
                    tracing::debug!(
                        %resource_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, will retry"
                    );
                    events.emit(TransferEvent::Retrying {
                        resource_id: resource_id.clone(),
                        next_attempt: attempt + 1,
                        delay_ms: delay.as_millis() as u64,
                        error: err,
                    });
                    if wait_before_retry(delay, task.cancel_token()).await == WaitOutcome::Cancelled {
                        task.mark_cancelled();
                        return Err(TransferError::Cancelled {
                            resource_id,
                            attempts: attempt,
                        });
                    }
                    attempt += 1;
                }
            }
        }
    }
}
