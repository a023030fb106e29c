//! Background delivery with a bounded retry queue.
//!
//! Submitted payloads are delivered by a dispatcher task, one spawned attempt
//! per payload. Payloads whose first attempt fails transiently move to a
//! bounded retry queue served by a single worker. When either queue is full
//! the payload is dropped with a warning; forwarding never blocks or fails a
//! request.

use std::sync::Arc;

use axum::body::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::client::{Deliver, ForwardError};
use super::retry::{RetryConfig, RetryResult, retry_after_failure};

/// Default capacity of the submission and retry queues.
pub const DEFAULT_CAPACITY: usize = 100;

/// Handle for submitting payloads. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ForwardQueue {
    submit_tx: mpsc::Sender<Bytes>,
}

/// Background tasks started by [`ForwardQueue::spawn`].
pub struct ForwardTasks {
    pub dispatcher: JoinHandle<()>,
    pub retry_worker: JoinHandle<()>,
}

impl ForwardQueue {
    /// Starts the dispatcher and retry worker.
    ///
    /// Both tasks exit once every `ForwardQueue` handle is dropped and
    /// in-flight payloads are settled.
    pub fn spawn<D: Deliver>(
        deliver: D,
        retry: RetryConfig,
        capacity: usize,
    ) -> (ForwardQueue, ForwardTasks) {
        let deliver = Arc::new(deliver);
        let (submit_tx, submit_rx) = mpsc::channel(capacity);
        let (retry_tx, retry_rx) = mpsc::channel(capacity);

        let dispatcher = tokio::spawn(dispatch(Arc::clone(&deliver), submit_rx, retry_tx));
        let retry_worker = tokio::spawn(redeliver(deliver, retry_rx, retry));

        (
            ForwardQueue { submit_tx },
            ForwardTasks {
                dispatcher,
                retry_worker,
            },
        )
    }

    /// Queues a payload for delivery. Returns false if it was dropped.
    pub fn submit(&self, payload: Bytes) -> bool {
        match self.submit_tx.try_send(payload) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Forward queue full, dropping payload");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Forward queue closed, dropping payload");
                false
            }
        }
    }
}

async fn dispatch<D: Deliver>(
    deliver: Arc<D>,
    mut submit_rx: mpsc::Receiver<Bytes>,
    retry_tx: mpsc::Sender<(Bytes, ForwardError)>,
) {
    while let Some(payload) = submit_rx.recv().await {
        let deliver = Arc::clone(&deliver);
        let retry_tx = retry_tx.clone();
        tokio::spawn(async move {
            match deliver.deliver(&payload).await {
                Ok(()) => debug!(bytes = payload.len(), "Forwarded payload"),
                Err(e) if e.is_transient() => {
                    warn!(error = %e, "Forwarding failed, queueing for retry");
                    if retry_tx.try_send((payload, e)).is_err() {
                        warn!("Retry queue full, dropping payload");
                    }
                }
                Err(e) => error!(error = %e, "Forwarding rejected by backend"),
            }
        });
    }
    debug!("Forward dispatcher stopped");
}

async fn redeliver<D: Deliver>(
    deliver: Arc<D>,
    mut retry_rx: mpsc::Receiver<(Bytes, ForwardError)>,
    config: RetryConfig,
) {
    while let Some((payload, first_error)) = retry_rx.recv().await {
        let result = retry_after_failure(config, first_error, || deliver.deliver(&payload)).await;
        match result {
            RetryResult::Success(()) => debug!(bytes = payload.len(), "Forwarded payload on retry"),
            RetryResult::ExhaustedRetries {
                last_error,
                attempts,
            } => error!(error = %last_error, attempts, "Giving up on forwarding payload"),
            RetryResult::PermanentError(e) => {
                error!(error = %e, "Forwarding rejected by backend on retry")
            }
        }
    }
    debug!("Forward retry worker stopped");
}
