//! Process lifecycle and termination signals.

use std::fmt;

use tracing::warn;

/// `Starting -> Running -> ShuttingDown -> Terminated`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Connections are being established; the subscription is not yet acknowledged.
    Starting,
    Running,
    ShuttingDown,
    Terminated,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::ShuttingDown => "shutting-down",
            LifecycleState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Resolves with the signal name on SIGINT or SIGTERM.
#[cfg(unix)]
pub async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "Cannot listen for SIGTERM, only SIGINT will stop the bridge");
            return match tokio::signal::ctrl_c().await {
                Ok(()) => "SIGINT",
                Err(_) => std::future::pending().await,
            };
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => "SIGINT",
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGINT");
                terminate.recv().await;
                "SIGTERM"
            }
        },
        _ = terminate.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
pub async fn shutdown_signal() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "SIGINT",
        Err(e) => {
            warn!(error = %e, "Cannot listen for ctrl-c");
            std::future::pending().await
        }
    }
}
