//! Transfer events and the ways callers consume them.
//!
//! The manager emits one tagged [`TransferEvent`] stream per transfer. Callers
//! pick a consumer: a closure, a channel ([`channel`]) for await-iteration, or
//! the [`Callbacks`] adapter for UI code written against `on_*` hooks.

use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::error::{ErrorKind, ErrorPayload};
use crate::progress::ProgressEstimate;
use crate::retry::FetchError;
use crate::task::ResourceId;

/// One progress sample of one attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub resource_id: ResourceId,
    pub attempt: u32,
    pub bytes_loaded: u64,
    pub bytes_total: Option<u64>,
    #[serde(flatten)]
    pub estimate: ProgressEstimate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TransferEvent {
    Started {
        resource_id: ResourceId,
    },
    Progress(ProgressUpdate),
    /// An attempt failed; the next one starts after `delay_ms` unless cancelled.
    Retrying {
        resource_id: ResourceId,
        next_attempt: u32,
        delay_ms: u64,
        error: FetchError,
    },
    Succeeded {
        resource_id: ResourceId,
        filename: String,
        path: PathBuf,
        bytes: u64,
        attempts: u32,
    },
    Failed {
        resource_id: ResourceId,
        error: ErrorPayload,
    },
    Cancelled {
        resource_id: ResourceId,
        attempts: u32,
    },
}

impl TransferEvent {
    pub fn resource_id(&self) -> &ResourceId {
        match self {
            TransferEvent::Started { resource_id }
            | TransferEvent::Retrying { resource_id, .. }
            | TransferEvent::Succeeded { resource_id, .. }
            | TransferEvent::Failed { resource_id, .. }
            | TransferEvent::Cancelled { resource_id, .. } => resource_id,
            TransferEvent::Progress(update) => &update.resource_id,
        }
    }

    /// True for the last event of a transfer.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferEvent::Succeeded { .. }
                | TransferEvent::Failed { .. }
                | TransferEvent::Cancelled { .. }
        )
    }
}

/// Consumer of transfer events.
pub trait EventSink: Send {
    fn emit(&mut self, event: TransferEvent);
}

impl<F> EventSink for F
where
    F: FnMut(TransferEvent) + Send,
{
    fn emit(&mut self, event: TransferEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreEvents;

impl EventSink for IgnoreEvents {
    fn emit(&mut self, _event: TransferEvent) {}
}

/// Sending half of an event channel.
#[derive(Debug, Clone)]
pub struct ChannelSink(mpsc::UnboundedSender<TransferEvent>);

impl EventSink for ChannelSink {
    fn emit(&mut self, event: TransferEvent) {
        let _ = self.0.send(event);
    }
}

/// Event channel: pass the sink to the manager, `recv().await` on the other end.
pub fn channel() -> (ChannelSink, mpsc::UnboundedReceiver<TransferEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSink(tx), rx)
}

type StartFn<'a> = Box<dyn FnMut(&ResourceId) + Send + 'a>;
type ProgressFn<'a> = Box<dyn FnMut(&ProgressUpdate) + Send + 'a>;
type SuccessFn<'a> = Box<dyn FnMut(&ResourceId, &str) + Send + 'a>;
type ErrorFn<'a> = Box<dyn FnMut(&ResourceId, &ErrorPayload) + Send + 'a>;

/// Callback-style adapter over the event stream.
///
/// Cancellation reaches `on_error` with kind [`ErrorKind::Cancelled`] so UI can
/// tell it apart and stay quiet. Retry notices have no hook.
#[derive(Default)]
pub struct Callbacks<'a> {
    on_start: Option<StartFn<'a>>,
    on_progress: Option<ProgressFn<'a>>,
    on_success: Option<SuccessFn<'a>>,
    on_error: Option<ErrorFn<'a>>,
}

impl<'a> Callbacks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(mut self, f: impl FnMut(&ResourceId) + Send + 'a) -> Self {
        self.on_start = Some(Box::new(f));
        self
    }

    pub fn on_progress(mut self, f: impl FnMut(&ProgressUpdate) + Send + 'a) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Receives the saved filename.
    pub fn on_success(mut self, f: impl FnMut(&ResourceId, &str) + Send + 'a) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnMut(&ResourceId, &ErrorPayload) + Send + 'a) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

impl EventSink for Callbacks<'_> {
    fn emit(&mut self, event: TransferEvent) {
        match event {
            TransferEvent::Started { resource_id } => {
                if let Some(f) = self.on_start.as_mut() {
                    f(&resource_id);
                }
            }
            TransferEvent::Progress(update) => {
                if let Some(f) = self.on_progress.as_mut() {
                    f(&update);
                }
            }
            TransferEvent::Retrying { .. } => {}
            TransferEvent::Succeeded {
                resource_id,
                filename,
                ..
            } => {
                if let Some(f) = self.on_success.as_mut() {
                    f(&resource_id, &filename);
                }
            }
            TransferEvent::Failed { resource_id, error } => {
                if let Some(f) = self.on_error.as_mut() {
                    f(&resource_id, &error);
                }
            }
            TransferEvent::Cancelled {
                resource_id,
                attempts,
            } => {
                if let Some(f) = self.on_error.as_mut() {
                    let payload = ErrorPayload {
                        kind: ErrorKind::Cancelled,
                        attempts: Some(attempts),
                        fetch_kind: None,
                        message: format!("transfer of {} was cancelled", resource_id),
                    };
                    f(&resource_id, &payload);
                }
            }
        }
    }
}
