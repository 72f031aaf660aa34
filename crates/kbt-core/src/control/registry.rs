//! Registry of active transfers, keyed by resource id.
//!
//! One registry per [`TransferManager`](crate::TransferManager). The duplicate
//! check and the insert happen under one lock, so two `begin` calls for the
//! same id can never both succeed.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::TransferError;
use crate::task::{ResourceId, TransferTask};

use super::token::CancelToken;

#[derive(Debug, Default)]
pub struct TransferRegistry {
    active: Mutex<HashMap<ResourceId, CancelToken>>,
}

impl TransferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ResourceId, CancelToken>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a new task for `resource_id`.
    ///
    /// Fails with [`TransferError::DuplicateInProgress`] if one is already
    /// active. The returned slot releases the registration when dropped.
    pub fn begin(
        &self,
        resource_id: &ResourceId,
    ) -> Result<(TransferTask, ActiveSlot<'_>), TransferError> {
        let token = CancelToken::new();
        {
            let mut active = self.lock();
            if active.contains_key(resource_id) {
                return Err(TransferError::DuplicateInProgress {
                    resource_id: resource_id.clone(),
                });
            }
            active.insert(resource_id.clone(), token.clone());
        }
        tracing::debug!(%resource_id, "transfer slot opened");
        let slot = ActiveSlot {
            registry: self,
            resource_id: resource_id.clone(),
            token: token.clone(),
        };
        Ok((TransferTask::new(resource_id.clone(), token), slot))
    }

    /// Releases the slot for `resource_id`. No-op if it is not active.
    pub fn end(&self, resource_id: &ResourceId) {
        if self.lock().remove(resource_id).is_some() {
            tracing::debug!(%resource_id, "transfer slot released");
        }
    }

    fn end_if_owned(&self, resource_id: &ResourceId, token: &CancelToken) {
        let mut active = self.lock();
        if active
            .get(resource_id)
            .is_some_and(|current| current.same_as(token))
        {
            active.remove(resource_id);
            tracing::debug!(%resource_id, "transfer slot released");
        }
    }

    pub fn is_active(&self, resource_id: &ResourceId) -> bool {
        self.lock().contains_key(resource_id)
    }

    /// Active resource ids, sorted.
    pub fn list_active(&self) -> Vec<ResourceId> {
        let mut ids: Vec<ResourceId> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Fires the cancel token of the active task for `resource_id`.
    /// Returns false (and does nothing) if no task is active.
    pub fn cancel(&self, resource_id: &ResourceId) -> bool {
        let token = self.lock().get(resource_id).cloned();
        match token {
            Some(token) => {
                token.cancel();
                tracing::info!(%resource_id, "transfer cancel requested");
                true
            }
            None => false,
        }
    }

    /// Cancels every active task; returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let tokens: Vec<CancelToken> = self.lock().values().cloned().collect();
        for token in &tokens {
            token.cancel();
        }
        tokens.len()
    }
}

/// Registration held by a running transfer; ends it on drop, so an abandoned
/// transfer future still frees its resource id.
#[derive(Debug)]
pub struct ActiveSlot<'a> {
    registry: &'a TransferRegistry,
    resource_id: ResourceId,
    token: CancelToken,
}

impl Drop for ActiveSlot<'_> {
    fn drop(&mut self) {
        self.registry.end_if_owned(&self.resource_id, &self.token);
    }
}
