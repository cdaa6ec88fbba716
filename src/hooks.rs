use crate::app::ExitReason;
use crate::identity::WorkloadIdentity;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Error type produced by user hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed future returned by a hook invocation.
pub type HookFuture = Pin<Box<dyn Future<Output = std::result::Result<(), HookError>> + Send>>;

pub(crate) type StartupHook = Box<dyn Fn(StartupContext) -> HookFuture + Send + Sync>;
pub(crate) type ShutdownHook = Box<dyn Fn(ShutdownContext) -> HookFuture + Send + Sync>;
pub(crate) type ProbeHook = Arc<dyn Fn(ProbeContext) -> HookFuture + Send + Sync>;

/// Mutable key/value store shared across all hook invocations.
///
/// Lives for the whole process lifetime. Probe hooks run concurrently with a
/// pending startup or shutdown hook, so access goes through a mutex; any
/// coordination beyond single get/insert calls is the hook author's concern.
#[derive(Clone, Default)]
pub struct Locals {
    inner: Arc<Mutex<HashMap<String, Value>>>,
}

impl Locals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by key, cloning it out of the store.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.lock().get(key).cloned()
    }

    /// Insert a value, returning the previous one if present.
    pub fn insert<K: Into<String>, V: Into<Value>>(&self, key: K, value: V) -> Option<Value> {
        self.inner.lock().insert(key.into(), value.into())
    }

    /// Remove a value by key.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.lock().remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl std::fmt::Debug for Locals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locals")
            .field("len", &self.inner.lock().len())
            .finish()
    }
}

/// Handle that lets user code trigger the exit sequence.
///
/// Handed to the startup hook so long-running work can request a voluntary
/// shutdown; triggering more than once is harmless, only the first request
/// starts the exit sequence.
#[derive(Clone)]
pub struct ExitHandle {
    tx: mpsc::Sender<ExitReason>,
}

impl ExitHandle {
    pub(crate) fn new(tx: mpsc::Sender<ExitReason>) -> Self {
        Self { tx }
    }

    /// Request the exit sequence with the given reason.
    pub fn trigger(&self, reason: ExitReason) {
        if self.tx.try_send(reason).is_err() {
            debug!("Exit already requested, ignoring trigger");
        }
    }
}

/// Context handed to the startup hook.
pub struct StartupContext {
    /// Parsed configuration document
    pub config: Arc<Value>,

    /// Shared mutable store
    pub locals: Locals,

    /// Handle for triggering a voluntary exit from within user code
    pub exit: ExitHandle,
}

/// Context handed to the shutdown hook.
pub struct ShutdownContext {
    /// Parsed configuration document
    pub config: Arc<Value>,

    /// Shared mutable store
    pub locals: Locals,

    /// What triggered the exit sequence
    pub reason: ExitReason,
}

/// Context handed to the probe hook on every probe request.
pub struct ProbeContext {
    /// Parsed configuration document
    pub config: Arc<Value>,

    /// Shared mutable store
    pub locals: Locals,

    /// Path segment of the probe request, typically "liveness" or "readiness"
    pub probe_type: String,

    /// Identity of this workload instance
    pub identity: WorkloadIdentity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locals_insert_and_get() {
        let locals = Locals::new();
        assert!(locals.is_empty());

        assert_eq!(locals.insert("counter", 1), None);
        assert_eq!(locals.get("counter"), Some(Value::from(1)));

        assert_eq!(locals.insert("counter", 2), Some(Value::from(1)));
        assert_eq!(locals.get("counter"), Some(Value::from(2)));
    }

    #[test]
    fn test_locals_shared_by_clone() {
        let locals = Locals::new();
        let other = locals.clone();

        locals.insert("seen", true);
        assert_eq!(other.get("seen"), Some(Value::from(true)));

        other.remove("seen");
        assert_eq!(locals.get("seen"), None);
    }
}
