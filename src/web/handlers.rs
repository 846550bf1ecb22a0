//! HTTP handlers for the exporter.

use crate::metrics::{self, EXPOSITION_CONTENT_TYPE};
use crate::probes::ProbeRegistry;
use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode, Uri},
    response::IntoResponse,
};
use std::fmt::Write;
use std::sync::Arc;

/// Serve the current readings in exposition format.
pub async fn get_metrics(State(registry): State<Arc<ProbeRegistry>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        metrics::render(&registry),
    )
}

/// Describe the request that did not match any route.
pub async fn not_found(
    method: Method,
    uri: Uri,
    args: Option<Query<Vec<(String, String)>>>,
) -> impl IntoResponse {
    let args = args.map(|Query(args)| args).unwrap_or_default();

    let mut message = String::from("File Not Found\n\n");
    let _ = writeln!(message, "URI: {}", uri.path());
    let _ = writeln!(message, "Method: {}", method);
    let _ = writeln!(message, "Arguments: {}", args.len());
    for (name, value) in &args {
        let _ = writeln!(message, " {}: {}", name, value);
    }

    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        message,
    )
}
