use crate::streaming::{self, Inventory};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

/// A file server running in the background.
pub struct ServerHandle {
    /// Address the listener is actually bound to.
    pub local_addr: SocketAddr,
}

/// Bind the listener and start serving `inventory` on a background task.
///
/// Binding happens before this returns so that a busy port is reported as a
/// startup failure. axum spawns one task per accepted connection, so a slow
/// transfer never holds up other clients. There is no graceful shutdown:
/// the server lives until the process exits.
pub async fn start_server(addr: SocketAddr, inventory: Arc<Inventory>) -> Result<ServerHandle> {
    let mut paths: Vec<&str> = inventory.paths().collect();
    paths.sort_unstable();
    tracing::debug!(?paths, "Registered served files");
    let app = streaming::file_router(inventory);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server to {}", addr))?;
    let local_addr = listener
        .local_addr()
        .context("Failed to read HTTP server address")?;

    tracing::info!("Serving local files on {}", local_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    Ok(ServerHandle { local_addr })
}

/// Resolve once Ctrl+C or SIGTERM is received.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::debug!("Shutdown signal received");
}
