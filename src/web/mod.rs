//! HTTP surface of the exporter.
//!
//! Serves the exposition text on `/` and `/metrics` for a pull-based
//! collector. The handlers only read the shared registry; they never touch
//! the bus or wait for a conversion.

pub mod config;
pub mod handlers;
pub mod router;

// Re-export commonly used items
pub use config::WebConfig;
pub use router::create_app;

use crate::error::{ExporterError, Result};
use crate::probes::ProbeRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Start the web server with the provided configuration and registry.
pub async fn start_web_server(config: WebConfig, registry: Arc<ProbeRegistry>) -> Result<()> {
    let app = create_app(registry);

    // Parse the bind address
    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| ExporterError::config_error(format!("Invalid bind address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ExporterError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    info!("HTTP server started at http://{}", addr);
    info!("Metrics endpoint: http://{}/metrics", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| ExporterError::web_server_error(format!("Server error: {}", e)))?;

    Ok(())
}
