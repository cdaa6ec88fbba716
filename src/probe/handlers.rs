use crate::app::LifecycleState;
use crate::hooks::ProbeContext;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, warn};

use super::server::ProbeState;

/// Handler for every probe request.
///
/// The path segment after the leading `/` is the probe type token, passed
/// through to the user hook uninterpreted. Responses carry no body: 200 when
/// the orchestrator is ready and the hook succeeds, 500 otherwise.
pub(crate) async fn probe_handler(
    State(state): State<ProbeState>,
    request: Request<Body>,
) -> StatusCode {
    let probe_type = request.uri().path().trim_start_matches('/').to_string();
    let current = *state.state.borrow();

    if current == LifecycleState::Starting {
        warn!("Probe '{}' failed: still starting", probe_type);
        return StatusCode::INTERNAL_SERVER_ERROR;
    }

    // The exiting flag is raised before the state flips, so a probe racing
    // the exit sequence is rejected even while the state still reads Ready.
    if state.exiting.load(Ordering::SeqCst) || current != LifecycleState::Ready {
        warn!("Probe '{}' failed: exiting", probe_type);
        return StatusCode::INTERNAL_SERVER_ERROR;
    }

    let ctx = ProbeContext {
        config: Arc::clone(&state.config),
        locals: state.locals.clone(),
        probe_type: probe_type.clone(),
        identity: state.identity.clone(),
    };

    match (state.hook)(ctx).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            error!("Probe '{}' hook failed: {}", probe_type, e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
