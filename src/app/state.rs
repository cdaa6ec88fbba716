use super::manager::LifecycleManager;
use super::types::LifecycleState;
use crate::hooks::Locals;
use crate::identity::WorkloadIdentity;
use crate::signals::FailureHandle;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

impl LifecycleManager {
    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        *self.state_tx.borrow()
    }

    /// Whether an exit has been triggered
    pub fn is_exiting(&self) -> bool {
        self.is_exiting.load(Ordering::SeqCst)
    }

    /// Process exit status: 0 for a clean shutdown, 1 if any failure was
    /// recorded along the way.
    pub fn exit_code(&self) -> i32 {
        if self.failed.load(Ordering::SeqCst) {
            1
        } else {
            0
        }
    }

    /// Address the probe server is bound to, once it has started.
    pub fn probe_addr(&self) -> Option<SocketAddr> {
        *self.probe_addr.lock()
    }

    /// The shared locals store.
    pub fn locals(&self) -> Locals {
        self.locals.clone()
    }

    /// The parsed configuration document (empty mapping before `run`).
    pub fn config(&self) -> Arc<Value> {
        Arc::clone(&self.config.lock())
    }

    /// Identity of this workload instance.
    pub fn identity(&self) -> &WorkloadIdentity {
        &self.identity
    }

    /// Handle for reporting fatal failures from user-spawned tasks.
    pub fn failure_handle(&self) -> FailureHandle {
        FailureHandle::new(self.failure_tx.clone())
    }

    /// Wait until the shutdown sequence has completed, returning the exit code.
    pub async fn wait_exited(&self) -> i32 {
        let mut rx = self.state_tx.subscribe();
        while *rx.borrow_and_update() != LifecycleState::Exited {
            if rx.changed().await.is_err() {
                break;
            }
        }
        self.exit_code()
    }
}
