//! Webhook endpoint handlers.
//!
//! `GET` answers the subscription handshake. `POST` accepts event
//! deliveries, persists them before answering, and reports the outcome.
//! This is the only place outcomes become HTTP statuses.

use std::collections::HashMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{debug, info, warn};

use super::AppState;
use crate::ingest::{Outcome, Rejection};
use crate::webhooks::{SIGNATURE_HEADER, verify_handshake};

/// Query parameter carrying the handshake mode.
const PARAM_MODE: &str = "hub.mode";
/// Query parameter carrying the shared verify token.
const PARAM_VERIFY_TOKEN: &str = "hub.verify_token";
/// Query parameter carrying the challenge to echo.
const PARAM_CHALLENGE: &str = "hub.challenge";

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        match self {
            Rejection::InvalidSignature | Rejection::Forbidden(_) => {
                StatusCode::FORBIDDEN.into_response()
            }
            Rejection::Malformed(_) => {
                (StatusCode::BAD_REQUEST, "malformed webhook body").into_response()
            }
        }
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        match self {
            Outcome::Success { stored } => {
                (StatusCode::OK, Json(json!({ "status": "ok", "stored": stored }))).into_response()
            }
            Outcome::PartialFailure { stored, errors } => (
                StatusCode::OK,
                Json(json!({ "status": "partial", "stored": stored, "errors": errors })),
            )
                .into_response(),
            Outcome::Rejected(rejection) => rejection.into_response(),
        }
    }
}

/// Subscription handshake handler.
///
/// # Response
///
/// - 200 OK: `hub.challenge` echoed verbatim as plain text
/// - 403 Forbidden: wrong mode or token, or no challenge (empty body)
///
/// # Example
///
/// ```ignore
/// GET /webhook?hub.mode=subscribe&hub.verify_token=s3cret&hub.challenge=1158201444 HTTP/1.1
///
/// HTTP/1.1 200 OK
/// Content-Type: text/plain; charset=utf-8
///
/// 1158201444
/// ```
pub async fn verify_handler(
    State(app_state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mode = params.get(PARAM_MODE).map(String::as_str);
    let token = params.get(PARAM_VERIFY_TOKEN).map(String::as_str);
    let challenge = params.get(PARAM_CHALLENGE).map(String::as_str);

    match verify_handshake(mode, challenge, token, &app_state.config().verify_token) {
        Ok(challenge) => {
            info!("Webhook subscription verified");
            (StatusCode::OK, challenge.to_string()).into_response()
        }
        Err(e) => {
            warn!(mode = ?mode, error = %e, "Webhook subscription rejected");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// Event delivery handler.
///
/// # Request
///
/// - Method: POST
/// - Optional header: `X-Hub-Signature-256` (required when an app secret is configured)
/// - Body: JSON page envelope
///
/// # Response
///
/// - 200 OK: `{"status":"ok","stored":n}` or `{"status":"partial","stored":n,"errors":[...]}`
/// - 400 Bad Request: body is not a page envelope
/// - 403 Forbidden: bad signature or foreign page
pub async fn event_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Outcome {
    let signature = get_header(&headers, SIGNATURE_HEADER);
    debug!(bytes = body.len(), signed = signature.is_some(), "Received webhook");

    app_state.ingestor().ingest(body, signature).await
}

fn get_header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
