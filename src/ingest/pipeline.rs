//! Delivery processing: verify, parse, classify, persist.
//!
//! Persistence for a delivery runs in its own task. The request waits for it
//! up to the store timeout; after that it reports a partial outcome while the
//! task carries on, so every `event_in` written still gets its one
//! confirmation attempt.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::forward::ForwardQueue;
use crate::persistence::{Incoming, PersistenceGateway};
use crate::types::PageId;
use crate::webhooks::{
    Classified, WebhookEnvelope, classify_envelope, parse_envelope, verify_event_source,
    verify_signature,
};

use super::outcome::{Outcome, Rejection};

/// Processes webhook deliveries for one page.
#[derive(Clone)]
pub struct Ingestor {
    page_id: PageId,
    /// When set, deliveries must carry a valid `X-Hub-Signature-256`.
    app_secret: Option<Vec<u8>>,
    gateway: PersistenceGateway,
    store_timeout: Duration,
    forward: Option<ForwardQueue>,
}

impl Ingestor {
    pub fn new(page_id: PageId, gateway: PersistenceGateway, store_timeout: Duration) -> Self {
        Ingestor {
            page_id,
            app_secret: None,
            gateway,
            store_timeout,
            forward: None,
        }
    }

    pub fn with_app_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.app_secret = Some(secret.into());
        self
    }

    pub fn with_forwarding(mut self, queue: ForwardQueue) -> Self {
        self.forward = Some(queue);
        self
    }

    /// Processes a delivery received now.
    pub async fn ingest(&self, body: Bytes, signature: Option<&str>) -> Outcome {
        self.ingest_at(body, signature, Utc::now()).await
    }

    /// Processes a delivery received at `received_at`.
    ///
    /// Every event of the delivery shares `received_at` as its `time_id`.
    pub async fn ingest_at(
        &self,
        body: Bytes,
        signature: Option<&str>,
        received_at: DateTime<Utc>,
    ) -> Outcome {
        let envelope = match self.admit(&body, signature) {
            Ok(envelope) => envelope,
            Err(rejection) => {
                warn!(page_id = %self.page_id, error = %rejection, "Rejected delivery");
                return Outcome::Rejected(rejection);
            }
        };

        let items = classify_envelope(&envelope, received_at);
        debug!(
            page_id = %self.page_id,
            entries = envelope.entries.len(),
            items = items.len(),
            "Classified delivery"
        );

        let mut errors: Vec<String> = items
            .iter()
            .filter_map(|item| match item {
                Classified::Rejected(rejected) => Some(rejected.error.to_string()),
                Classified::Event(_) => None,
            })
            .collect();

        let stored = Arc::new(AtomicUsize::new(0));
        let task = tokio::spawn(persist_all(self.gateway.clone(), items, Arc::clone(&stored)));
        match tokio::time::timeout(self.store_timeout, task).await {
            Ok(Ok(store_errors)) => errors.extend(store_errors),
            Ok(Err(join_error)) => {
                error!(page_id = %self.page_id, error = %join_error, "Persistence task failed");
                errors.push(format!("persistence task failed: {}", join_error));
            }
            Err(_) => {
                warn!(
                    page_id = %self.page_id,
                    timeout_ms = self.store_timeout.as_millis() as u64,
                    "Persistence still running after timeout, answering early"
                );
                errors.push(format!(
                    "persistence timed out after {} ms",
                    self.store_timeout.as_millis()
                ));
            }
        }

        self.forward_if_comment(&envelope, body);

        let stored = stored.load(Ordering::SeqCst);
        if errors.is_empty() {
            info!(page_id = %self.page_id, stored, "Delivery stored");
            Outcome::Success { stored }
        } else {
            warn!(
                page_id = %self.page_id,
                stored,
                errors = errors.len(),
                "Delivery partially stored"
            );
            Outcome::PartialFailure { stored, errors }
        }
    }

    /// Signature, envelope and page checks. Nothing is persisted on failure.
    fn admit(&self, body: &[u8], signature: Option<&str>) -> Result<WebhookEnvelope, Rejection> {
        if let Some(secret) = &self.app_secret {
            let valid = signature.is_some_and(|header| verify_signature(body, header, secret));
            if !valid {
                return Err(Rejection::InvalidSignature);
            }
        }

        let envelope = parse_envelope(body)?;

        for entry in &envelope.entries {
            verify_event_source(&entry.page_id, &self.page_id).map_err(Rejection::Forbidden)?;
        }

        Ok(envelope)
    }

    fn forward_if_comment(&self, envelope: &WebhookEnvelope, body: Bytes) {
        if let Some(queue) = &self.forward
            && envelope.has_comment()
        {
            debug!(page_id = %self.page_id, "Forwarding delivery with comments");
            queue.submit(body);
        }
    }
}

/// Writes each item as `event_in` followed by its confirmation.
///
/// Returns one message per failed write. `stored` counts normalized events
/// whose `event_in` record was written.
async fn persist_all(
    gateway: PersistenceGateway,
    items: Vec<Classified>,
    stored: Arc<AtomicUsize>,
) -> Vec<String> {
    let mut errors = Vec::new();

    for item in items {
        let (time_id, page_id) = match &item {
            Classified::Event(event) => (event.time_id, event.page_id.clone()),
            Classified::Rejected(rejected) => (rejected.time_id, rejected.page_id.clone()),
        };
        let incoming = Incoming::from(item);
        let event_type = incoming.event_type();
        let forced = incoming.needs_force();

        let receipt = match gateway.record_incoming(time_id, page_id.clone(), incoming).await {
            Ok(receipt) => receipt,
            Err(e) => {
                error!(
                    page_id = %page_id,
                    event_type = %event_type,
                    error = %e,
                    "Failed to store incoming event"
                );
                errors.push(format!("storing {} event failed: {}", event_type, e));
                continue;
            }
        };
        if !forced {
            stored.fetch_add(1, Ordering::SeqCst);
        }

        if let Err(e) = gateway.record_confirmation(&receipt, forced).await {
            error!(
                page_id = %page_id,
                record_id = %receipt.record_id,
                error = %e,
                "Failed to store confirmation"
            );
            errors.push(format!(
                "confirming record {} failed: {}",
                receipt.record_id, e
            ));
        }
    }

    errors
}
