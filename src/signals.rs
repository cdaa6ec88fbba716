//! Routes OS termination signals and unrecoverable runtime failures into the
//! single exit entry point.
//!
//! Four sources feed one sink: SIGINT, SIGTERM, failures reported from
//! spawned tasks via [`FailureHandle`], and uncaught panics captured through
//! the process panic hook. Subscription happens at the start of `run` and is
//! removed at the start of `exit`, so a second concurrent trigger can never
//! re-enter the shutdown sequence.

use crate::app::ExitReason;
use std::panic::{self, PanicHookInfo};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Clonable handle for reporting an unrecoverable failure from user-spawned
/// work. The first report triggers the exit sequence.
#[derive(Clone)]
pub struct FailureHandle {
    tx: mpsc::UnboundedSender<String>,
}

impl FailureHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    /// Report a fatal failure, requesting the exit sequence.
    pub fn report<E: std::fmt::Display>(&self, error: E) {
        if self.tx.send(error.to_string()).is_err() {
            debug!("Failure reported after bridge shutdown, ignoring");
        }
    }
}

/// Bridges signal and failure sources to the exit channel.
pub struct SignalBridge {
    exit_tx: mpsc::Sender<ExitReason>,
    // Shared with the forwarder task so a later subscribe gets it back
    failure_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    tasks: Vec<JoinHandle<()>>,
    prev_panic_hook: Option<Arc<dyn Fn(&PanicHookInfo<'_>) + Send + Sync>>,
    subscribed: bool,
}

impl SignalBridge {
    pub fn new(
        exit_tx: mpsc::Sender<ExitReason>,
        failure_rx: mpsc::UnboundedReceiver<String>,
    ) -> Self {
        Self {
            exit_tx,
            failure_rx: Arc::new(Mutex::new(failure_rx)),
            tasks: Vec::new(),
            prev_panic_hook: None,
            subscribed: false,
        }
    }

    /// Subscribe one handler to each source. Calling twice is a no-op.
    pub fn subscribe(&mut self) {
        if self.subscribed {
            return;
        }
        self.subscribed = true;

        // Handle SIGTERM (pod termination) - Unix only
        #[cfg(unix)]
        {
            let exit_tx = self.exit_tx.clone();
            self.tasks.push(tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};
                if let Some(()) = signal(SignalKind::terminate())
                    .expect("Failed to register SIGTERM handler")
                    .recv()
                    .await
                {
                    info!("Received SIGTERM signal");
                    let _ = exit_tx.send(ExitReason::Signal("SIGTERM".to_string())).await;
                }
            }));
        }

        // Handle SIGINT (Ctrl+C) - Cross-platform
        let exit_tx = self.exit_tx.clone();
        self.tasks.push(tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                let _ = exit_tx.send(ExitReason::Signal("SIGINT".to_string())).await;
            }
        }));

        // Failures reported from user-spawned tasks. Aborting the forwarder
        // releases the lock, so the receiver survives an unsubscribe.
        let failure_rx = Arc::clone(&self.failure_rx);
        let exit_tx = self.exit_tx.clone();
        self.tasks.push(tokio::spawn(async move {
            let mut failure_rx = failure_rx.lock().await;
            if let Some(message) = failure_rx.recv().await {
                info!("Task failure reported: {}", message);
                let _ = exit_tx.send(ExitReason::Failure(message)).await;
            }
        }));

        // Uncaught panics, forwarded through the process panic hook
        let (panic_tx, mut panic_rx) = mpsc::unbounded_channel::<String>();
        let prev: Arc<dyn Fn(&PanicHookInfo<'_>) + Send + Sync> = Arc::from(panic::take_hook());
        self.prev_panic_hook = Some(Arc::clone(&prev));
        panic::set_hook(Box::new(move |info| {
            let _ = panic_tx.send(panic_message(info));
            prev(info);
        }));

        let exit_tx = self.exit_tx.clone();
        self.tasks.push(tokio::spawn(async move {
            if let Some(message) = panic_rx.recv().await {
                let _ = exit_tx.send(ExitReason::Panic(message)).await;
            }
        }));
    }

    /// Remove all subscriptions. Safe to call multiple times.
    pub fn unsubscribe(&mut self) {
        if !self.subscribed {
            return;
        }
        self.subscribed = false;

        for task in self.tasks.drain(..) {
            task.abort();
        }

        if let Some(prev) = self.prev_panic_hook.take() {
            panic::set_hook(Box::new(move |info| prev(info)));
        }
    }
}

impl Drop for SignalBridge {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

fn panic_message(info: &PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };

    match info.location() {
        Some(location) => format!("{} at {}", message, location),
        None => message,
    }
}
