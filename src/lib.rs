pub mod app;
pub mod config;
pub mod error;
pub mod hooks;
pub mod identity;
pub mod invoker;
pub mod probe;
pub mod signals;

pub use app::{
    ExitReason, LifecycleManager, LifecycleOptions, LifecycleState, DEFAULT_MAX_SHUTDOWN,
    DEFAULT_MAX_STARTUP,
};
pub use config::{RuntimeSettings, DEFAULT_PROBE_PORT, PROBE_PORT_ENV, WORKLOAD_NAME_ENV};
pub use error::{LifecycleError, Result};
pub use hooks::{
    ExitHandle, HookError, HookFuture, Locals, ProbeContext, ShutdownContext, StartupContext,
};
pub use identity::WorkloadIdentity;
pub use probe::ProbeServer;
pub use signals::{FailureHandle, SignalBridge};
