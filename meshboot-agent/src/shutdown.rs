//! Interrupt handling

use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};

/// Resolves once SIGTERM or SIGINT is received
///
/// If the handlers cannot be installed this never resolves, leaving the
/// caller to finish on its own.
pub async fn wait_for_signal() {
    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Failed to install signal handlers: {}", e);
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT");
        }
    }
}
