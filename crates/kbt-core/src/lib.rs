//! Transfer manager core for the KBT knowledge-base client.
//!
//! Retrieves resource payloads with live progress, cooperative cancellation,
//! bounded retry with a delay schedule, and concurrency-capped batches. The
//! transport ([`Fetcher`]) and persistence ([`Storage`]) are collaborators
//! behind traits; [`CurlFetcher`] and [`DirectoryStorage`] are the stock ones.

pub mod config;
pub mod logging;

pub mod control;
pub mod error;
pub mod events;
pub mod executor;
pub mod manager;
pub mod progress;
pub mod retry;
pub mod scheduler;
pub mod storage;
pub mod task;
pub mod transport;
pub mod url_model;

pub use control::{CancelToken, Cancellation};
pub use error::{ErrorKind, ErrorPayload, TransferError};
pub use events::{Callbacks, EventSink, IgnoreEvents, ProgressUpdate, TransferEvent};
pub use executor::CompletedTransfer;
pub use manager::{TransferManager, TransferSettings};
pub use retry::{FetchError, FetchErrorKind, RetryPolicy};
pub use scheduler::{BatchOptions, BatchSummary};
pub use storage::{DirectoryStorage, Storage};
pub use task::{ResourceId, TaskState};
pub use transport::{CurlFetcher, FetchRequest, FetchedResource, Fetcher, ProgressReporter, ResponseHeaders};
