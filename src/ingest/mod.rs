//! Delivery ingestion.
//!
//! Ties the webhook checks, parser and classifier to the persistence
//! gateway, and summarizes each delivery as an [`Outcome`].

pub mod outcome;
pub mod pipeline;

pub use outcome::{Outcome, Rejection};
pub use pipeline::Ingestor;
