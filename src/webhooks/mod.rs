//! Webhook handling for page events.
//!
//! This module provides:
//! - Signature verification for webhook payloads (HMAC-SHA256)
//! - Subscription handshake and event-source checks
//! - Envelope parsing into typed shapes
//! - Classification into normalized events

pub mod classify;
pub mod envelope;
pub mod events;
pub mod parser;
pub mod signature;
pub mod verify;

pub use classify::{Classified, ClassifyError, RejectedItem, classify_entry, classify_envelope};
pub use envelope::{Change, Entry, FeedChange, MessagingItem, MessagingMessage, WebhookEnvelope};
pub use events::{
    Attachment, CommentData, EventData, EventType, LikeData, LogType, MessageData,
    NormalizedEvent, ReactionData,
};
pub use parser::{ParseError, parse_envelope};
pub use signature::{
    SIGNATURE_HEADER, compute_signature, format_signature_header, parse_signature_header,
    verify_signature,
};
pub use verify::{SUBSCRIBE_MODE, VerifyError, verify_event_source, verify_handshake};
