//! Transport collaborator: fetch one resource by id.
//!
//! The transfer manager only knows the [`Fetcher`] trait. A transport reports
//! byte progress through the [`ProgressReporter`] it is handed, honours the
//! cancellation capability, and returns the payload with its response
//! headers. [`CurlFetcher`] is the HTTP implementation.

mod http;

pub use http::CurlFetcher;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::control::Cancellation;
use crate::retry::FetchError;
use crate::task::ResourceId;

/// Sends `(bytes loaded, total bytes if known)` samples to the executor.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: mpsc::UnboundedSender<(u64, Option<u64>)>,
}

impl ProgressReporter {
    /// Reporter plus the receiving end the executor drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<(u64, Option<u64>)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Reports progress. Silently dropped once the attempt is over.
    pub fn report(&self, loaded: u64, total: Option<u64>) {
        let _ = self.tx.send((loaded, total));
    }
}

/// Everything a transport needs for one attempt.
pub struct FetchRequest {
    pub progress: ProgressReporter,
    pub cancel: Arc<dyn Cancellation>,
    /// Upper bound for the whole attempt.
    pub timeout: Duration,
}

/// Response headers, looked up case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    entries: Vec<(String, String)>,
}

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Parses one raw `Name: value` header line; status lines and blank
    /// lines are ignored.
    pub fn push_line(&mut self, line: &str) {
        let line = line.trim_end();
        if let Some((name, value)) = line.split_once(':') {
            if !name.is_empty() && !name.contains(' ') {
                self.insert(name.trim(), value.trim());
            }
        }
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Payload and metadata of a successful fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchedResource {
    pub payload: Vec<u8>,
    pub headers: ResponseHeaders,
}

/// Retrieves resource payloads.
///
/// Implementations must stop promptly once `request.cancel` reports
/// cancelled, and should report progress as bytes arrive.
pub trait Fetcher: Send + Sync {
    fn fetch(
        &self,
        resource_id: &ResourceId,
        request: FetchRequest,
    ) -> impl Future<Output = Result<FetchedResource, FetchError>> + Send;
}

impl<F: Fetcher> Fetcher for Arc<F> {
    fn fetch(
        &self,
        resource_id: &ResourceId,
        request: FetchRequest,
    ) -> impl Future<Output = Result<FetchedResource, FetchError>> + Send {
        (**self).fetch(resource_id, request)
    }
}
