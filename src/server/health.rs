//! Liveness probe.
//!
//! Answers without touching the store, so a slow or unavailable backend
//! never makes the process look dead to an orchestrator.

use axum::http::StatusCode;

/// Returns 200 with the text "OK".
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
