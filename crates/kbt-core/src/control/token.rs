//! Cooperative cancellation token.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

/// Cancellation capability handed to transport collaborators.
///
/// Transports poll [`is_cancelled`](Cancellation::is_cancelled) or register a
/// callback; they never depend on the concrete token type.
pub trait Cancellation: Send + Sync {
    fn is_cancelled(&self) -> bool;

    /// Runs `callback` once when cancellation happens, or right away if it
    /// already has.
    fn on_cancel(&self, callback: Box<dyn FnOnce() + Send>);
}

type Callback = Box<dyn FnOnce() + Send>;

struct Inner {
    token: CancellationToken,
    /// `None` once the callbacks have run.
    callbacks: Mutex<Option<Vec<Callback>>>,
}

/// One token per transfer task. Clones share state.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::from_token(CancellationToken::new())
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_token(token: CancellationToken) -> Self {
        Self {
            inner: Arc::new(Inner {
                token,
                callbacks: Mutex::new(Some(Vec::new())),
            }),
        }
    }

    /// A token that fires when `self` does, and can also be fired on its
    /// own without touching `self`. Used to stop a single attempt.
    pub fn child_token(&self) -> CancelToken {
        let child = Self::from_token(self.inner.token.child_token());
        let relay = child.clone();
        Cancellation::on_cancel(
            self,
            Box::new(move || {
                relay.cancel();
            }),
        );
        child
    }

    /// Fires the token. Returns false if it was already cancelled.
    pub fn cancel(&self) -> bool {
        let callbacks = self
            .inner
            .callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        self.inner.token.cancel();
        match callbacks {
            Some(callbacks) => {
                for cb in callbacks {
                    cb();
                }
                true
            }
            None => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    pub(crate) fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Completes once the token is cancelled.
    pub async fn cancelled(&self) {
        self.inner.token.cancelled().await
    }
}

impl Cancellation for CancelToken {
    fn is_cancelled(&self) -> bool {
        CancelToken::is_cancelled(self)
    }

    fn on_cancel(&self, callback: Box<dyn FnOnce() + Send>) {
        {
            let mut guard = self
                .inner
                .callbacks
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if let Some(pending) = guard.as_mut() {
                if !self.inner.token.is_cancelled() {
                    pending.push(callback);
                    return;
                }
            }
        }
        callback();
    }
}
