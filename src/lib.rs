//! Page Webhook - a receiver for Facebook Page webhook deliveries.
//!
//! This library verifies subscription handshakes and deliveries, classifies
//! page events (messages, comments, reactions, likes), and logs every event
//! durably before acknowledging it.

pub mod config;
pub mod forward;
pub mod ingest;
pub mod persistence;
pub mod server;
pub mod types;
pub mod webhooks;

#[cfg(test)]
mod test_utils;
