//! HTTP server for the page webhook.
//!
//! This module implements the HTTP server that:
//! - Answers the platform's subscription handshake
//! - Accepts event deliveries and persists them before acknowledging
//! - Provides health checks for liveness probes
//!
//! # Endpoints
//!
//! - `GET <path>` - Subscription handshake, for every configured webhook path
//! - `POST <path>` - Event delivery, for every configured webhook path
//! - `GET /health` - Returns 200 if server is running

use std::sync::Arc;

pub mod health;
pub mod webhook;

pub use health::health_handler;
pub use webhook::{event_handler, verify_handler};

use crate::config::Config;
use crate::ingest::Ingestor;

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Arc<Config>,
    ingestor: Ingestor,
}

impl AppState {
    pub fn new(config: Arc<Config>, ingestor: Ingestor) -> Self {
        AppState {
            inner: Arc::new(AppStateInner { config, ingestor }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.inner.ingestor
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::get;

    let mut router = axum::Router::new().route("/health", get(health_handler));
    for path in &app_state.config().webhook_paths {
        router = router.route(path, get(verify_handler).post(event_handler));
    }
    router.with_state(app_state)
}
