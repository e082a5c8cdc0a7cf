//! Server startup helper for embedding in the settlement engine binary.
//!
//! Provides [`spawn_server`] which launches the HTTP + event-channel
//! server on a background Tokio task. The engine binary calls this during
//! startup so the API runs concurrently with the tick loop.

use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Spawn the HTTP + event-channel server on a background Tokio task.
///
/// Binds to `0.0.0.0:{port}` and serves the admin REST surface plus the
/// player event channel. Returns a [`JoinHandle`] so the caller can
/// manage the server's lifecycle alongside the tick loop.
///
/// The server runs until the Tokio runtime is shut down or the task is
/// aborted. The caller should hold the returned handle and abort or
/// await it during clean shutdown.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the requested address cannot be
/// parsed. This is detected eagerly before the background task is
/// spawned; bind failures inside the task itself are only logged, since
/// the task has already been handed back to the caller.
pub async fn spawn_server(port: u16, state: AppState) -> Result<JoinHandle<()>, StartupError> {
    let config = ServerConfig {
        host: String::from("0.0.0.0"),
        port,
    };

    let addr_str = format!("{}:{}", config.host, config.port);
    let _: std::net::SocketAddr = addr_str.parse().map_err(|e| {
        StartupError::Server(ServerError::Bind(format!("invalid address {addr_str}: {e}")))
    })?;

    let handle = tokio::spawn(async move {
        if let Err(err) = crate::server::start_server(&config, state).await {
            tracing::error!(error = %err, "settlement engine server exited with error");
        }
    });

    tracing::info!(port, "settlement engine server spawned on background task");

    Ok(handle)
}
