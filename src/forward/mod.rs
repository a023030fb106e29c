//! Comment forwarding to a downstream backend.
//!
//! Deliveries that contain at least one feed comment are posted, unchanged,
//! to `FORWARD_URL` after they have been persisted. Forwarding runs entirely
//! off the request path and never changes the webhook response.

pub mod client;
pub mod queue;
pub mod retry;

pub use client::{API_KEY_HEADER, Deliver, ForwardError, Forwarder};
pub use queue::{DEFAULT_CAPACITY, ForwardQueue, ForwardTasks};
pub use retry::{RetryConfig, RetryResult, retry_after_failure};
