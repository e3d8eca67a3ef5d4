use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::AppState;

/// Wait for SIGTERM or ctrl-c, then flip the health check to 503.
///
/// In-flight requests are drained by axum once this returns.
pub async fn wait_for_shutdown(state: Arc<AppState>) {
    shutdown_signal().await;
    info!("shutdown signal received");
    state.shutting_down.store(true, Ordering::Relaxed);
}

/// How long in-flight requests get to finish after the signal
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Drive `server` to completion, but give it at most `grace` once
/// `signalled` resolves. Returns `None` when the deadline cut it off.
pub async fn drain_with_deadline<S, G>(server: S, signalled: G, grace: Duration) -> Option<S::Output>
where
    S: Future,
    G: Future<Output = ()>,
{
    tokio::pin!(server);
    tokio::select! {
        out = &mut server => return Some(out),
        _ = signalled => {}
    }
    tokio::time::timeout(grace, server).await.ok()
}

/// Listen for SIGTERM (Kubernetes pod termination) or ctrl-c.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to listen for SIGTERM, using ctrl-c only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("SIGTERM received"),
        _ = tokio::signal::ctrl_c() => info!("ctrl-c received"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("ctrl-c received");
}
