//! Scripted transport and in-memory storage for driving the manager.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use kbt_core::{
    Cancellation, EventSink, FetchError, FetchErrorKind, FetchRequest, FetchedResource, Fetcher, ProgressUpdate,
    ResourceId, ResponseHeaders, Storage, TransferEvent,
};
use tokio::time::Instant;

/// What one fetch call does.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub progress: Vec<(u64, Option<u64>)>,
    pub delay: Duration,
    pub outcome: Outcome,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Succeed {
        body: Vec<u8>,
        disposition: Option<String>,
    },
    Fail(FetchErrorKind),
    /// Runs until the attempt's cancellation fires.
    Hang,
}

impl Attempt {
    pub fn succeed(len: usize) -> Self {
        Self {
            progress: Vec::new(),
            delay: Duration::from_millis(100),
            outcome: Outcome::Succeed {
                body: vec![b'x'; len],
                disposition: None,
            },
        }
    }

    pub fn fail(kind: FetchErrorKind) -> Self {
        Self {
            progress: Vec::new(),
            delay: Duration::from_millis(100),
            outcome: Outcome::Fail(kind),
        }
    }

    pub fn hang() -> Self {
        Self {
            progress: Vec::new(),
            delay: Duration::ZERO,
            outcome: Outcome::Hang,
        }
    }

    pub fn with_progress(mut self, progress: &[(u64, Option<u64>)]) -> Self {
        self.progress = progress.to_vec();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_disposition(mut self, value: &str) -> Self {
        if let Outcome::Succeed { disposition, .. } = &mut self.outcome {
            *disposition = Some(value.to_string());
        }
        self
    }
}

/// Plays back a per-resource script, one entry per call (the last entry
/// repeats). Records every call and the peak number of calls in flight.
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<ResourceId, Vec<Attempt>>>,
    default: Attempt,
    calls: Mutex<Vec<(ResourceId, Instant)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    aborted: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::with_default(Attempt::succeed(16))
    }

    pub fn with_default(default: Attempt) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            aborted: AtomicUsize::new(0),
        }
    }

    pub fn script(self, id: impl Into<ResourceId>, attempts: Vec<Attempt>) -> Self {
        self.scripts.lock().unwrap().insert(id.into(), attempts);
        self
    }

    pub fn calls_for(&self, id: impl Into<ResourceId>) -> Vec<Instant> {
        let id = id.into();
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| *r == id)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_order(&self) -> Vec<ResourceId> {
        self.calls.lock().unwrap().iter().map(|(r, _)| r.clone()).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Hanging calls that saw their cancellation and returned.
    pub fn aborted(&self) -> usize {
        self.aborted.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn next_attempt(&self, id: &ResourceId) -> Attempt {
        let mut calls = self.calls.lock().unwrap();
        let n = calls.iter().filter(|(r, _)| r == id).count();
        calls.push((id.clone(), Instant::now()));
        let scripts = self.scripts.lock().unwrap();
        match scripts.get(id) {
            Some(list) if !list.is_empty() => list[n.min(list.len() - 1)].clone(),
            _ => self.default.clone(),
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Fetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        resource_id: &ResourceId,
        request: FetchRequest,
    ) -> Result<FetchedResource, FetchError> {
        let plan = self.next_attempt(resource_id);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        for (loaded, total) in &plan.progress {
            request.progress.report(*loaded, *total);
        }
        if !plan.delay.is_zero() {
            tokio::time::sleep(plan.delay).await;
        }
        match plan.outcome {
            Outcome::Succeed { body, disposition } => {
                let mut headers = ResponseHeaders::new();
                if let Some(value) = disposition {
                    headers.insert("Content-Disposition", value);
                }
                Ok(FetchedResource {
                    payload: body,
                    headers,
                })
            }
            Outcome::Fail(kind) => Err(FetchError::new(kind, "scripted failure")),
            Outcome::Hang => {
                let (tx, rx) = tokio::sync::oneshot::channel::<()>();
                request.cancel.on_cancel(Box::new(move || {
                    let _ = tx.send(());
                }));
                let _ = rx.await;
                self.aborted.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::cancelled())
            }
        }
    }
}

/// Keeps saved payloads in memory.
#[derive(Default)]
pub struct MemoryStorage {
    saved: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved_names(&self) -> Vec<String> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn save_count(&self) -> usize {
        self.saved.lock().unwrap().len()
    }
}

impl Storage for MemoryStorage {
    fn save(&self, payload: &[u8], filename: &str) -> io::Result<PathBuf> {
        self.saved
            .lock()
            .unwrap()
            .push((filename.to_string(), payload.to_vec()));
        Ok(PathBuf::from("/memory").join(filename))
    }
}

/// Storage that always fails, e.g. a full disk.
pub struct FailingStorage;

impl Storage for FailingStorage {
    fn save(&self, _payload: &[u8], _filename: &str) -> io::Result<PathBuf> {
        Err(io::Error::new(io::ErrorKind::Other, "disk full"))
    }
}

/// Storage whose saves only finish once `peers` of them are running at
/// the same time. A save that waits alone for `patience` fails.
pub struct RendezvousStorage {
    peers: usize,
    patience: Duration,
    arrived: Mutex<usize>,
    all_here: Condvar,
}

impl RendezvousStorage {
    pub fn new(peers: usize, patience: Duration) -> Self {
        Self {
            peers,
            patience,
            arrived: Mutex::new(0),
            all_here: Condvar::new(),
        }
    }
}

impl Storage for RendezvousStorage {
    fn save(&self, _payload: &[u8], filename: &str) -> io::Result<PathBuf> {
        let mut arrived = self.arrived.lock().unwrap();
        *arrived += 1;
        self.all_here.notify_all();
        let (arrived, wait) = self
            .all_here
            .wait_timeout_while(arrived, self.patience, |n| *n < self.peers)
            .unwrap();
        if wait.timed_out() && *arrived < self.peers {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "saved alone"));
        }
        Ok(PathBuf::from("/rendezvous").join(filename))
    }
}

/// Collects every event in order.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<TransferEvent>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self) -> Vec<&ProgressUpdate> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TransferEvent::Progress(update) => Some(update),
                _ => None,
            })
            .collect()
    }

    pub fn last(&self) -> Option<&TransferEvent> {
        self.events.last()
    }

    pub fn count_terminal(&self) -> usize {
        self.events.iter().filter(|e| e.is_terminal()).count()
    }
}

impl EventSink for Recorder {
    fn emit(&mut self, event: TransferEvent) {
        self.events.push(event);
    }
}
