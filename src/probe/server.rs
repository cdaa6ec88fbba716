use crate::app::LifecycleState;
use crate::error::{LifecycleError, Result};
use crate::hooks::{Locals, ProbeHook};
use crate::identity::WorkloadIdentity;
use axum::Router;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::handlers::probe_handler;

/// Shared state for the probe handler
#[derive(Clone)]
pub(crate) struct ProbeState {
    pub(crate) state: watch::Receiver<LifecycleState>,
    pub(crate) exiting: Arc<AtomicBool>,
    pub(crate) hook: ProbeHook,
    pub(crate) config: Arc<Value>,
    pub(crate) locals: Locals,
    pub(crate) identity: WorkloadIdentity,
}

impl ProbeState {
    pub(crate) fn new(
        state: watch::Receiver<LifecycleState>,
        exiting: Arc<AtomicBool>,
        hook: ProbeHook,
        config: Arc<Value>,
        locals: Locals,
        identity: WorkloadIdentity,
    ) -> Self {
        Self {
            state,
            exiting,
            hook,
            config,
            locals,
            identity,
        }
    }
}

/// HTTP listener answering probe requests.
pub struct ProbeServer {
    local_addr: SocketAddr,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl ProbeServer {
    /// Bind the listener and start serving probe requests.
    ///
    /// Port 0 binds an ephemeral port; the effective address is available via
    /// [`ProbeServer::local_addr`].
    pub(crate) async fn start(port: u16, state: ProbeState) -> Result<Self> {
        let app = Router::new().fallback(probe_handler).with_state(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| LifecycleError::Bind { port, source: e })?;
        let local_addr = listener.local_addr()?;

        info!("Probe server listening on {}", local_addr);

        let token = CancellationToken::new();
        let accept_token = token.clone();
        let task = tokio::spawn(accept_loop(listener, app, accept_token));

        Ok(Self {
            local_addr,
            token,
            task,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop the server, closing the listener and terminating any open
    /// connections immediately.
    pub(crate) async fn stop(self) -> Result<()> {
        self.token.cancel();

        match self.task.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(LifecycleError::system(format!(
                "Probe server task failed: {}",
                e
            ))),
        }
    }
}

async fn accept_loop(listener: TcpListener, app: Router, token: CancellationToken) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("Probe connection from {}", peer);
                    tokio::spawn(serve_connection(stream, app.clone(), token.child_token()));
                }
                Err(e) => {
                    debug!("Probe accept error: {}", e);
                }
            }
        }
    }

    info!("Probe server stopped");
}

async fn serve_connection(stream: TcpStream, app: Router, token: CancellationToken) {
    let service = TowerToHyperService::new(app);
    let connection = http1::Builder::new().serve_connection(TokioIo::new(stream), service);

    tokio::select! {
        // Dropping the connection future closes the socket mid-flight; probe
        // traffic is disposable by contract.
        _ = token.cancelled() => {}
        result = connection => {
            if let Err(e) = result {
                debug!("Probe connection error: {}", e);
            }
        }
    }
}
