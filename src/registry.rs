//! Destination-address → conversation map.
//!
//! One registry instance lives for a test run. `create`/`remove` run on the
//! test's call path while `lookup` runs on the inbound-callback path, so
//! every operation takes the single registry mutex for its whole duration.

use crate::conversation::{Conversation, Shared};
use crate::error::RegistryError;
use crate::message::Address;
use crate::transport::Transport;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) struct RegistryInner {
    entries: Mutex<HashMap<Address, Arc<Shared>>>,
    transport: Arc<dyn Transport>,
    source: Address,
}

impl RegistryInner {
    pub(crate) fn lookup(&self, destination: &Address) -> Option<Arc<Shared>> {
        self.entries.lock().get(destination).cloned()
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Remove `destination` only while it still maps to `shared`. Keeps a
    /// stale handle's dispose from tearing down a successor conversation
    /// registered for the same number.
    pub(crate) fn remove_entry(&self, destination: &Address, shared: &Arc<Shared>) {
        let mut entries = self.entries.lock();
        if entries
            .get(destination)
            .is_some_and(|current| Arc::ptr_eq(current, shared))
        {
            entries.remove(destination);
            tracing::debug!(%destination, "conversation disposed");
        }
    }
}

/// Registry of active conversations, keyed by normalized destination number.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// `source` is the number outbound messages are sent from.
    pub fn new(transport: Arc<dyn Transport>, source: Address) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                entries: Mutex::new(HashMap::new()),
                transport,
                source,
            }),
        }
    }

    /// Register a new conversation with `destination`.
    ///
    /// Fails with [`RegistryError::AlreadyActive`] when the number is already
    /// registered; the existing conversation keeps receiving its
    /// notifications untouched.
    pub fn create(&self, destination: Address) -> Result<Conversation, RegistryError> {
        let mut entries = self.inner.entries.lock();
        if entries.contains_key(&destination) {
            return Err(RegistryError::AlreadyActive { destination });
        }
        let shared = Arc::new(Shared::new(
            destination.clone(),
            self.inner.source.clone(),
            self.inner.transport.clone(),
        ));
        entries.insert(destination.clone(), shared.clone());
        tracing::debug!(%destination, "conversation registered");
        Ok(Conversation::new(shared, Arc::downgrade(&self.inner)))
    }

    pub(crate) fn lookup(&self, destination: &Address) -> Option<Arc<Shared>> {
        self.inner.lookup(destination)
    }

    pub(crate) fn transport(&self) -> Arc<dyn Transport> {
        self.inner.transport.clone()
    }

    /// Unregister `destination`. No-op when absent.
    pub fn remove(&self, destination: &Address) {
        self.inner.entries.lock().remove(destination);
    }

    /// Drop every registration (test-run teardown).
    pub fn clear(&self) {
        self.inner.entries.lock().clear();
    }

    /// Number of active conversations.
    pub fn active_count(&self) -> usize {
        self.inner.entries.lock().len()
    }
}
