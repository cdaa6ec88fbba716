use std::fmt;

/// Orchestrator lifecycle states
///
/// Transitions are strictly forward: Starting → Ready → Exiting → Exited,
/// with Starting → Exiting reachable directly when startup fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Ready,
    Exiting,
    Exited,
}

/// What triggered the exit sequence
///
/// A termination signal is a normal way for Kubernetes to stop a pod, so
/// signal-triggered exits are clean; only captured failures set a non-zero
/// exit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// Programmatic exit with no error
    Clean,
    /// OS termination signal, carrying the signal name
    Signal(String),
    /// A captured failure (startup error, timeout, reported task failure)
    Failure(String),
    /// An uncaught panic, carrying the panic message
    Panic(String),
}

impl ExitReason {
    /// Whether this reason denotes a failure and forces a non-zero exit status.
    pub fn is_failure(&self) -> bool {
        matches!(self, ExitReason::Failure(_) | ExitReason::Panic(_))
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Clean => write!(f, "clean exit"),
            ExitReason::Signal(name) => write!(f, "signal {}", name),
            ExitReason::Failure(message) => write!(f, "failure: {}", message),
            ExitReason::Panic(message) => write!(f, "panic: {}", message),
        }
    }
}
