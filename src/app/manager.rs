use super::types::{ExitReason, LifecycleState};
use crate::config::RuntimeSettings;
use crate::hooks::{
    HookError, HookFuture, Locals, ProbeContext, ProbeHook, ShutdownContext, ShutdownHook,
    StartupContext, StartupHook,
};
use crate::identity::WorkloadIdentity;
use crate::probe::ProbeServer;
use crate::signals::SignalBridge;
use parking_lot::Mutex;
use serde_json::Value;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::warn;

/// Default ceiling for the startup hook
pub const DEFAULT_MAX_STARTUP: Duration = Duration::from_secs(60);

/// Default ceiling for the shutdown hook
pub const DEFAULT_MAX_SHUTDOWN: Duration = Duration::from_secs(30);

/// Construction options for [`LifecycleManager`].
///
/// Every field is optional: the probe port and workload name fall back to
/// environment settings, the phase deadlines to the manager defaults. A
/// deadline of zero also falls back; there is no "wait forever" mode.
#[derive(Debug, Clone, Default)]
pub struct LifecycleOptions {
    /// Path to the user's configuration document (YAML, TOML or JSON)
    pub config_path: Option<PathBuf>,

    /// Probe server listen port (0 binds an ephemeral port)
    pub probe_port: Option<u16>,

    /// Workload identity string, e.g. the pod name
    pub workload_name: Option<String>,

    /// Hard ceiling for the startup hook
    pub max_startup: Option<Duration>,

    /// Hard ceiling for the shutdown hook
    pub max_shutdown: Option<Duration>,
}

/// Top-level lifecycle state machine.
///
/// Owns the configuration, the shared locals store, the probe server and the
/// signal bridge. Built once, hooks registered builder-style, then used as an
/// `Arc<LifecycleManager>`: `run` drives the startup sequence and `exit`
/// drives the (idempotent) shutdown sequence.
pub struct LifecycleManager {
    pub(super) config_path: Option<PathBuf>,
    pub(super) probe_port: u16,
    pub(super) identity: WorkloadIdentity,
    pub(super) max_startup: Duration,
    pub(super) max_shutdown: Duration,

    // Hook slots, set before run
    pub(super) startup_hook: StartupHook,
    pub(super) shutdown_hook: ShutdownHook,
    pub(super) probe_hook: ProbeHook,

    pub(super) config: Mutex<Arc<Value>>,
    pub(super) locals: Locals,

    // Lifecycle state
    pub(super) state_tx: watch::Sender<LifecycleState>,
    pub(super) is_exiting: Arc<AtomicBool>,
    pub(super) failed: AtomicBool,

    // Exit routing
    pub(super) exit_tx: mpsc::Sender<ExitReason>,
    pub(super) exit_rx: Mutex<Option<mpsc::Receiver<ExitReason>>>,
    pub(super) failure_tx: mpsc::UnboundedSender<String>,

    pub(super) bridge: Mutex<Option<SignalBridge>>,
    pub(super) probe_server: Mutex<Option<ProbeServer>>,
    pub(super) probe_addr: Mutex<Option<SocketAddr>>,
}

impl LifecycleManager {
    /// Create a manager with the given options and no-op hooks.
    pub fn new(options: LifecycleOptions) -> Self {
        let settings = RuntimeSettings::from_env().unwrap_or_else(|e| {
            warn!("Failed to read environment settings: {}", e);
            RuntimeSettings::default()
        });

        let probe_port = options.probe_port.unwrap_or(settings.probe_port);
        let workload_name = options.workload_name.unwrap_or(settings.workload_name);
        let identity = WorkloadIdentity::from_name(workload_name);

        let (exit_tx, exit_rx) = mpsc::channel(4);
        let (failure_tx, failure_rx) = mpsc::unbounded_channel();
        let bridge = SignalBridge::new(exit_tx.clone(), failure_rx);
        let (state_tx, _) = watch::channel(LifecycleState::Starting);

        Self {
            config_path: options.config_path,
            probe_port,
            identity,
            max_startup: resolve_deadline(options.max_startup, DEFAULT_MAX_STARTUP),
            max_shutdown: resolve_deadline(options.max_shutdown, DEFAULT_MAX_SHUTDOWN),
            startup_hook: Box::new(|_ctx| noop_outcome()),
            shutdown_hook: Box::new(|_ctx| noop_outcome()),
            probe_hook: Arc::new(|_ctx| noop_outcome()),
            config: Mutex::new(Arc::new(Value::Object(Default::default()))),
            locals: Locals::new(),
            state_tx,
            is_exiting: Arc::new(AtomicBool::new(false)),
            failed: AtomicBool::new(false),
            exit_tx,
            exit_rx: Mutex::new(Some(exit_rx)),
            failure_tx,
            bridge: Mutex::new(Some(bridge)),
            probe_server: Mutex::new(None),
            probe_addr: Mutex::new(None),
        }
    }

    /// Register the startup hook, replacing the no-op default.
    pub fn on_startup<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(StartupContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), HookError>> + Send + 'static,
    {
        self.startup_hook = Box::new(move |ctx| {
            let outcome: HookFuture = Box::pin(hook(ctx));
            outcome
        });
        self
    }

    /// Register the shutdown hook, replacing the no-op default.
    pub fn on_shutdown<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ShutdownContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), HookError>> + Send + 'static,
    {
        self.shutdown_hook = Box::new(move |ctx| {
            let outcome: HookFuture = Box::pin(hook(ctx));
            outcome
        });
        self
    }

    /// Register the probe hook, replacing the always-healthy default.
    pub fn on_probe<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ProbeContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), HookError>> + Send + 'static,
    {
        self.probe_hook = Arc::new(move |ctx| {
            let outcome: HookFuture = Box::pin(hook(ctx));
            outcome
        });
        self
    }
}

fn noop_outcome() -> HookFuture {
    Box::pin(async { Ok(()) })
}

fn resolve_deadline(requested: Option<Duration>, default: Duration) -> Duration {
    match requested {
        Some(limit) if !limit.is_zero() => limit,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_defaults() {
        assert_eq!(resolve_deadline(None, DEFAULT_MAX_STARTUP), DEFAULT_MAX_STARTUP);
        assert_eq!(
            resolve_deadline(Some(Duration::ZERO), DEFAULT_MAX_SHUTDOWN),
            DEFAULT_MAX_SHUTDOWN
        );
        assert_eq!(
            resolve_deadline(Some(Duration::from_millis(50)), DEFAULT_MAX_STARTUP),
            Duration::from_millis(50)
        );
    }
}
