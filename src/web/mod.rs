//! Local HTTP status endpoint.
//!
//! Serves the monitor's latest status and readings as JSON so other tools
//! (status bars, dashboards) can display them.

pub mod config;
pub mod handlers;
pub mod router;

// Re-export commonly used items
pub use config::WebConfig;
pub use router::{create_app, AppState};

use crate::error::{Result, WatchError};
use crate::monitor::MonitorHandle;
use std::future::Future;
use std::net::SocketAddr;
use tracing::info;

/// Serve the status endpoint until `shutdown` resolves.
pub async fn start_status_server<F>(config: WebConfig, handle: MonitorHandle, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_app(&config, handle);

    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| WatchError::config_error(format!("Invalid bind address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WatchError::Io(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("Status endpoint listening on http://{}", addr);
    info!("  - http://{}/api/status", addr);
    info!("  - http://{}/api/readings", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| WatchError::Io(format!("Status server error: {}", e)))?;

    Ok(())
}
