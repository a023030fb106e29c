//! Core identifier types shared by the webhook, persistence and server layers.

pub mod ids;

pub use ids::{PageId, PostId, RecordId};
