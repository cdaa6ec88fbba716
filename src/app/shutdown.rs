use super::manager::LifecycleManager;
use super::types::{ExitReason, LifecycleState};
use crate::error::Result;
use crate::hooks::ShutdownContext;
use crate::invoker;
use std::sync::atomic::Ordering;
use tracing::{debug, error, info};

impl LifecycleManager {
    /// Run the shutdown sequence exactly once.
    ///
    /// Order is fixed: exiting flag, unsubscribe the signal bridge, record the
    /// exit status, stop the probe server, invoke the shutdown hook. A second
    /// trigger (concurrent or later) returns immediately. A shutdown hook
    /// failure is logged and sets a failing exit status but does not stop the
    /// sequence; a failure in the orchestration itself hard-terminates the
    /// process, since no graceful path remains at that point.
    pub async fn exit(&self, reason: ExitReason) {
        if self.is_exiting.swap(true, Ordering::SeqCst) {
            debug!("Exit already in progress, ignoring trigger: {}", reason);
            return;
        }

        if let Err(e) = self.shutdown_sequence(reason).await {
            error!("Error during shutdown: {}", e);
            std::process::exit(1);
        }
    }

    async fn shutdown_sequence(&self, reason: ExitReason) -> Result<()> {
        if let Some(mut bridge) = self.bridge.lock().take() {
            bridge.unsubscribe();
        }

        self.state_tx.send_modify(|state| {
            if *state != LifecycleState::Exited {
                *state = LifecycleState::Exiting;
            }
        });

        info!("Exiting on {}", reason);
        if reason.is_failure() {
            self.failed.store(true, Ordering::SeqCst);
        }

        let server = self.probe_server.lock().take();
        if let Some(server) = server {
            server.stop().await?;
        }

        let ctx = ShutdownContext {
            config: self.config(),
            locals: self.locals.clone(),
            reason,
        };
        let outcome = invoker::invoke("shutdown", self.max_shutdown, (self.shutdown_hook)(ctx));
        if let Err(e) = outcome.await {
            error!("Shutdown hook failed: {}", e);
            self.failed.store(true, Ordering::SeqCst);
        }

        self.state_tx.send_replace(LifecycleState::Exited);
        Ok(())
    }
}
