//! Transfer control: per-task cancellation tokens and the active-task registry.
//!
//! Each started transfer gets a [`CancelToken`] registered under its resource
//! id. [`TransferRegistry::cancel`] resolves an id to the exact in-flight task
//! and fires its token; the executor and the retry wait observe it at their
//! next suspension point.

mod registry;
mod token;

pub use registry::{ActiveSlot, TransferRegistry};
pub use token::{CancelToken, Cancellation};
