//! Batch scheduler.
//!
//! Runs many resource transfers through one [`TransferManager`] with a hard
//! concurrency cap: ids are split into chunks of `concurrency`, each chunk
//! runs to full settlement before the next starts.
//!
//! [`TransferManager`]: crate::TransferManager

mod batch;

pub use batch::{BatchOptions, BatchSummary};
pub(crate) use batch::run_batch;
