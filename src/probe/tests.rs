use super::server::{ProbeServer, ProbeState};
use crate::app::LifecycleState;
use crate::hooks::{HookError, Locals, ProbeContext, ProbeHook};
use crate::identity::WorkloadIdentity;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

fn probe_hook<F, Fut>(hook: F) -> ProbeHook
where
    F: Fn(ProbeContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HookError>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(hook(ctx)))
}

fn ok_hook() -> ProbeHook {
    probe_hook(|_ctx| async { Ok(()) })
}

async fn start_test_server(
    state: LifecycleState,
    exiting: bool,
    hook: ProbeHook,
) -> (ProbeServer, watch::Sender<LifecycleState>, String) {
    let (state_tx, state_rx) = watch::channel(state);
    let probe_state = ProbeState::new(
        state_rx,
        Arc::new(AtomicBool::new(exiting)),
        hook,
        Arc::new(Value::Object(Default::default())),
        Locals::new(),
        WorkloadIdentity::from_name("worker-5"),
    );

    let server = ProbeServer::start(0, probe_state).await.unwrap();
    let url = format!("http://127.0.0.1:{}", server.local_addr().port());
    (server, state_tx, url)
}

#[tokio::test]
async fn test_probe_returns_200_when_ready() {
    let (server, _state_tx, url) = start_test_server(LifecycleState::Ready, false, ok_hook()).await;

    let response = reqwest::get(format!("{}/liveness", url)).await.unwrap();
    assert_eq!(response.status(), 200);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_probe_rejected_while_starting() {
    let calls = Arc::new(AtomicUsize::new(0));
    let hook_calls = Arc::clone(&calls);
    let hook = probe_hook(move |_ctx| {
        let calls = Arc::clone(&hook_calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });

    let (server, _state_tx, url) = start_test_server(LifecycleState::Starting, false, hook).await;

    let response = reqwest::get(format!("{}/readiness", url)).await.unwrap();
    assert_eq!(response.status(), 500);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_probe_rejected_once_exit_triggered() {
    // The state may still read Ready for a moment after an exit is triggered;
    // the exiting flag alone must gate the probe.
    let calls = Arc::new(AtomicUsize::new(0));
    let hook_calls = Arc::clone(&calls);
    let hook = probe_hook(move |_ctx| {
        let calls = Arc::clone(&hook_calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });

    let (server, _state_tx, url) = start_test_server(LifecycleState::Ready, true, hook).await;

    let response = reqwest::get(format!("{}/readiness", url)).await.unwrap();
    assert_eq!(response.status(), 500);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_probe_hook_failure_returns_500() {
    let hook = probe_hook(|_ctx| async { Err("dependency unreachable".into()) });
    let (server, _state_tx, url) = start_test_server(LifecycleState::Ready, false, hook).await;

    let response = reqwest::get(format!("{}/liveness", url)).await.unwrap();
    assert_eq!(response.status(), 500);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_probe_type_and_identity_reach_the_hook() {
    let hook = probe_hook(|ctx: ProbeContext| async move {
        ctx.locals.insert("probe_type", ctx.probe_type.clone());
        ctx.locals.insert("ordinal", ctx.identity.ordinal);
        Ok(())
    });

    let (state_tx, state_rx) = watch::channel(LifecycleState::Ready);
    let locals = Locals::new();
    let probe_state = ProbeState::new(
        state_rx,
        Arc::new(AtomicBool::new(false)),
        hook,
        Arc::new(Value::Object(Default::default())),
        locals.clone(),
        WorkloadIdentity::from_name("worker-5"),
    );
    let server = ProbeServer::start(0, probe_state).await.unwrap();
    let url = format!("http://127.0.0.1:{}", server.local_addr().port());

    let response = reqwest::get(format!("{}/readiness", url)).await.unwrap();
    assert_eq!(response.status(), 200);

    assert_eq!(locals.get("probe_type"), Some(Value::from("readiness")));
    assert_eq!(locals.get("ordinal"), Some(Value::from(5)));

    drop(state_tx);
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_terminates_open_connections() {
    let hook = probe_hook(|_ctx| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    });
    let (server, _state_tx, url) = start_test_server(LifecycleState::Ready, false, hook).await;

    let request = tokio::spawn(reqwest::get(format!("{}/liveness", url)));
    tokio::time::sleep(Duration::from_millis(150)).await;

    server.stop().await.unwrap();

    // The in-flight request is cut off rather than drained to completion.
    let outcome = tokio::time::timeout(Duration::from_secs(2), request)
        .await
        .expect("stop must not wait for the slow probe")
        .unwrap();
    assert!(outcome.is_err());
}

#[tokio::test]
async fn test_stop_closes_the_listener() {
    let (server, _state_tx, url) = start_test_server(LifecycleState::Ready, false, ok_hook()).await;
    server.stop().await.unwrap();

    let outcome = reqwest::get(format!("{}/liveness", url)).await;
    assert!(outcome.is_err());
}
