//! Web application router and middleware setup.

use crate::probes::ProbeRegistry;
use crate::web::handlers;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Create the axum application serving the metrics endpoints.
///
/// `GET /` and `GET /metrics` render the registry; everything else,
/// including other methods on those paths, gets the diagnostic 404.
pub fn create_app(registry: Arc<ProbeRegistry>) -> Router {
    Router::new()
        .route("/", get(handlers::get_metrics).fallback(handlers::not_found))
        .route("/metrics", get(handlers::get_metrics).fallback(handlers::not_found))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}
