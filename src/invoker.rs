//! Races a single hook invocation against its phase deadline.
//!
//! The loser of the race is abandoned, not cancelled: a timed-out hook keeps
//! running as a detached task and its side effects may still land, but the
//! orchestrator stops waiting for it.

use crate::error::{LifecycleError, Result};
use crate::hooks::HookError;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Run a hook future, producing its outcome if it settles before the deadline
/// and a timeout failure carrying the configured limit otherwise.
///
/// The hook runs as its own task so a deadline miss detaches it instead of
/// dropping it mid-poll.
pub async fn invoke<F>(phase: &'static str, limit: Duration, hook: F) -> Result<()>
where
    F: Future<Output = std::result::Result<(), HookError>> + Send + 'static,
{
    debug!("Invoking {} hook with {} ms deadline", phase, limit.as_millis());

    let task = tokio::spawn(hook);
    match timeout(limit, task).await {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(e))) => Err(LifecycleError::hook(phase, e.to_string())),
        Ok(Err(join_error)) => Err(LifecycleError::hook(phase, join_error.to_string())),
        Err(_) => {
            warn!("Abandoning {} hook after {} ms", phase, limit.as_millis());
            Err(LifecycleError::HookTimeout {
                phase,
                limit_ms: limit.as_millis() as u64,
            })
        }
    }
}
