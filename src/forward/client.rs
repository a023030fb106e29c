//! HTTP delivery of comment payloads to the backend.

use std::future::Future;
use std::time::Duration;

use axum::body::Bytes;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

/// Header carrying the backend API key.
pub const API_KEY_HEADER: &str = "api_key";

/// Backend statuses that count as delivered.
const SUCCESS_STATUSES: [u16; 4] = [200, 201, 202, 204];

/// Forwarding failures.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The request could not be sent or timed out.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend answered {status}")]
    Status { status: u16 },
}

impl ForwardError {
    /// Returns true if a later attempt may succeed.
    ///
    /// Client errors other than timeouts and rate limits are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            ForwardError::Request(_) => true,
            ForwardError::Status { status } => {
                *status >= 500 || *status == 408 || *status == 429
            }
        }
    }
}

/// Delivers one payload.
pub trait Deliver: Send + Sync + 'static {
    fn deliver(&self, payload: &Bytes) -> impl Future<Output = Result<(), ForwardError>> + Send;
}

/// Posts raw webhook bodies to the configured backend.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl Forwarder {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ForwardError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Forwarder {
            client,
            url: url.into(),
            api_key,
        })
    }
}

impl Deliver for Forwarder {
    async fn deliver(&self, payload: &Bytes) -> Result<(), ForwardError> {
        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.clone());
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let status = request.send().await?.status().as_u16();
        if SUCCESS_STATUSES.contains(&status) {
            Ok(())
        } else {
            Err(ForwardError::Status { status })
        }
    }
}
