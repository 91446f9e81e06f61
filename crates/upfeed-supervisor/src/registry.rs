//! Process-local registry for the running feed service.
//!
//! The supervisor jobs and the connection manager run in the same process;
//! the registry is the one place a job can reach the live manager to inspect
//! or tear it down. Cross-process observers go through the status store
//! instead.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::warn;
use upfeed_core::ConnectionStats;
use upfeed_ws::ConnectionManager;

/// Handle to a live connection manager.
#[derive(Clone)]
pub struct ServiceHandle {
    manager: Arc<ConnectionManager>,
}

impl ServiceHandle {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    pub fn stats(&self) -> ConnectionStats {
        self.manager.connection_stats()
    }

    /// Request an intentional close. Idempotent.
    pub fn disconnect(&self) {
        self.manager.disconnect();
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }
}

/// Slot holding at most one live service handle per process.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    slot: Arc<RwLock<Option<ServiceHandle>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new handle, replacing any previous one. A replaced handle
    /// that is still live indicates a supervision bug, so it is logged.
    pub fn install(&self, handle: ServiceHandle) {
        let previous = self.slot.write().replace(handle);
        if let Some(previous) = previous {
            if previous.is_connected() {
                warn!("replacing a still-connected service handle");
                previous.disconnect();
            }
        }
    }

    pub fn get(&self) -> Option<ServiceHandle> {
        self.slot.read().clone()
    }

    pub fn take(&self) -> Option<ServiceHandle> {
        self.slot.write().take()
    }

    pub fn clear(&self) {
        self.slot.write().take();
    }

    /// Remove the handle only if it still wraps `manager`. Returns true when
    /// this call removed it; false means another owner already took the slot
    /// or installed a replacement.
    pub fn clear_if_current(&self, manager: &Arc<ConnectionManager>) -> bool {
        let mut slot = self.slot.write();
        match slot.as_ref() {
            Some(handle) if Arc::ptr_eq(handle.manager(), manager) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.slot.read().is_some()
    }
}
