//! CLI command handlers, one per file.

mod batch;
mod config;
mod get;

pub use batch::run_batch;
pub use config::run_config;
pub use get::run_get;

use kbt_core::{Fetcher, Storage, TransferManager};
use std::future::Future;

/// Drives `transfer` to completion; Ctrl-C cancels every active transfer,
/// which then settles as cancelled.
async fn cancel_on_interrupt<F, S, T>(
    manager: &TransferManager<F, S>,
    transfer: impl Future<Output = T>,
) -> T
where
    F: Fetcher,
    S: Storage,
{
    tokio::pin!(transfer);
    tokio::select! {
        out = &mut transfer => out,
        res = tokio::signal::ctrl_c() => {
            match res {
                Ok(()) => {
                    let n = manager.cancel_all();
                    tracing::info!(cancelled = n, "interrupted");
                }
                Err(e) => tracing::warn!("could not listen for Ctrl-C: {}", e),
            }
            transfer.await
        }
    }
}
