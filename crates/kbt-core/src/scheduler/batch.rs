//! Chunked, all-settled batch runs.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::join_all;

use crate::error::TransferError;
use crate::events::TransferEvent;
use crate::executor::CompletedTransfer;
use crate::manager::TransferManager;
use crate::storage::Storage;
use crate::task::ResourceId;
use crate::transport::Fetcher;

type ItemFn<'a> = Box<dyn Fn(&ResourceId) + Send + Sync + 'a>;
type DoneFn<'a> =
    Box<dyn Fn(&ResourceId, Result<&CompletedTransfer, &TransferError>) + Send + Sync + 'a>;
type BatchProgressFn<'a> = Box<dyn Fn(usize, usize) + Send + Sync + 'a>;
type EventFn<'a> = Box<dyn Fn(&TransferEvent) + Send + Sync + 'a>;

/// Batch configuration and hooks.
///
/// Hooks are shared by every transfer in a chunk, hence `Fn + Sync`.
pub struct BatchOptions<'a> {
    pub concurrency: usize,
    on_item_start: Option<ItemFn<'a>>,
    on_item_done: Option<DoneFn<'a>>,
    on_batch_progress: Option<BatchProgressFn<'a>>,
    on_event: Option<EventFn<'a>>,
}

impl<'a> BatchOptions<'a> {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            on_item_start: None,
            on_item_done: None,
            on_batch_progress: None,
            on_event: None,
        }
    }

    /// Called right before an item's transfer begins.
    pub fn on_item_start(mut self, f: impl Fn(&ResourceId) + Send + Sync + 'a) -> Self {
        self.on_item_start = Some(Box::new(f));
        self
    }

    /// Called once per item with its outcome.
    pub fn on_item_done(
        mut self,
        f: impl Fn(&ResourceId, Result<&CompletedTransfer, &TransferError>) + Send + Sync + 'a,
    ) -> Self {
        self.on_item_done = Some(Box::new(f));
        self
    }

    /// Called with `(completed, total)` after every item settles.
    pub fn on_batch_progress(mut self, f: impl Fn(usize, usize) + Send + Sync + 'a) -> Self {
        self.on_batch_progress = Some(Box::new(f));
        self
    }

    /// Receives every per-item transfer event (progress, retries, ...).
    pub fn on_event(mut self, f: impl Fn(&TransferEvent) + Send + Sync + 'a) -> Self {
        self.on_event = Some(Box::new(f));
        self
    }
}

/// Outcome counts of a batch. Partial failure is not an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Items that were already transferring when their turn came.
    pub skipped: usize,
}

impl BatchSummary {
    fn record(&mut self, result: &Result<CompletedTransfer, TransferError>) {
        match result {
            Ok(_) => self.succeeded += 1,
            Err(TransferError::DuplicateInProgress { .. }) => self.skipped += 1,
            Err(TransferError::Cancelled { .. }) => self.cancelled += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total
    }
}

/// Runs `resource_ids` in chunks of `options.concurrency`.
///
/// Fails only on invalid input, before anything starts. Every item's
/// failure stays with that item.
pub(crate) async fn run_batch<F: Fetcher, S: Storage>(
    manager: &TransferManager<F, S>,
    resource_ids: Vec<ResourceId>,
    options: &BatchOptions<'_>,
) -> Result<BatchSummary, TransferError> {
    if options.concurrency == 0 {
        return Err(TransferError::SchedulerInput(
            "concurrency must be at least 1".to_string(),
        ));
    }

    let total = resource_ids.len();
    let completed = AtomicUsize::new(0);
    let mut summary = BatchSummary {
        total,
        ..BatchSummary::default()
    };
    tracing::info!(total, concurrency = options.concurrency, "batch started");

    for (index, chunk) in resource_ids.chunks(options.concurrency).enumerate() {
        tracing::debug!(chunk = index, size = chunk.len(), "batch chunk started");
        let settled = join_all(chunk.iter().map(|resource_id| {
            let completed = &completed;
            async move {
                if let Some(f) = &options.on_item_start {
                    f(resource_id);
                }
                let mut forward = |event: TransferEvent| {
                    if let Some(f) = &options.on_event {
                        f(&event);
                    }
                };
                let result = manager.start(resource_id.clone(), &mut forward).await;
                if let Some(f) = &options.on_item_done {
                    f(resource_id, result.as_ref());
                }
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(f) = &options.on_batch_progress {
                    f(done, total);
                }
                result
            }
        }))
        .await;

        for result in &settled {
            summary.record(result);
        }
    }

    tracing::info!(
        total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        cancelled = summary.cancelled,
        skipped = summary.skipped,
        "batch finished"
    );
    Ok(summary)
}
