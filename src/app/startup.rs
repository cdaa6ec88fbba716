use super::manager::LifecycleManager;
use super::types::{ExitReason, LifecycleState};
use crate::config::{self, PROBE_PORT_ENV};
use crate::error::{LifecycleError, Result};
use crate::hooks::{ExitHandle, StartupContext};
use crate::invoker;
use crate::probe::{ProbeServer, ProbeState};
use std::sync::Arc;
use tracing::{error, info};

impl LifecycleManager {
    /// Run the startup sequence: subscribe the signal bridge, load the
    /// configuration document, start the probe server, invoke the startup
    /// hook, then flip to Ready.
    ///
    /// Never returns an error to the caller: any failure in the sequence is
    /// redirected into the exit sequence instead.
    pub async fn run(self: Arc<Self>) {
        Self::spawn_exit_forwarder(&self);

        if let Some(bridge) = self.bridge.lock().as_mut() {
            bridge.subscribe();
        }

        match self.startup_sequence().await {
            Ok(()) => {
                // An exit triggered mid-startup wins; Ready is only reachable
                // from Starting.
                self.state_tx.send_modify(|state| {
                    if *state == LifecycleState::Starting {
                        *state = LifecycleState::Ready;
                    }
                });
                info!("Startup complete, serving probes on port {}", self.probe_port);
            }
            Err(e) => {
                error!("Startup failed: {}", e);
                self.exit(ExitReason::Failure(e.to_string())).await;
            }
        }
    }

    async fn startup_sequence(&self) -> Result<()> {
        let document = config::load_document(self.config_path.as_deref())?;
        *self.config.lock() = Arc::new(document);

        let probe_state = ProbeState::new(
            self.state_tx.subscribe(),
            Arc::clone(&self.is_exiting),
            Arc::clone(&self.probe_hook),
            self.config(),
            self.locals.clone(),
            self.identity.clone(),
        );

        let server = match ProbeServer::start(self.probe_port, probe_state).await {
            Ok(server) => server,
            Err(e) => {
                if let LifecycleError::Bind { port, .. } = &e {
                    error!(
                        "Port {} is already in use; override it with {} or LifecycleOptions::probe_port",
                        port, PROBE_PORT_ENV
                    );
                }
                return Err(e);
            }
        };
        *self.probe_addr.lock() = Some(server.local_addr());
        *self.probe_server.lock() = Some(server);

        let ctx = StartupContext {
            config: self.config(),
            locals: self.locals.clone(),
            exit: ExitHandle::new(self.exit_tx.clone()),
        };
        invoker::invoke("startup", self.max_startup, (self.startup_hook)(ctx)).await
    }

    /// Forward the first queued exit request (signal, reported failure, panic
    /// or user trigger) into the exit sequence.
    fn spawn_exit_forwarder(manager: &Arc<Self>) {
        let Some(mut exit_rx) = manager.exit_rx.lock().take() else {
            return;
        };

        let manager = Arc::downgrade(manager);
        tokio::spawn(async move {
            if let Some(reason) = exit_rx.recv().await {
                if let Some(manager) = manager.upgrade() {
                    manager.exit(reason).await;
                }
            }
        });
    }
}
