//! Typed view of a page webhook delivery.
//!
//! The platform batches notifications into an envelope of entries, one per
//! page, each carrying `messaging` items (direct messages and receipts) and
//! `changes` items (feed activity). Only a closed set of shapes is recognized;
//! everything else is kept as an explicit `Unknown` variant so the classifier
//! can skip it without probing optional fields.

use serde_json::Value;

use crate::types::{PageId, PostId};

use super::events::Attachment;

/// A decoded `object: "page"` delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEnvelope {
    /// Entries in delivery order.
    pub entries: Vec<Entry>,
}

impl WebhookEnvelope {
    /// Returns true if any entry carries a feed comment.
    pub fn has_comment(&self) -> bool {
        self.entries
            .iter()
            .flat_map(|entry| &entry.changes)
            .any(|change| matches!(change, Change::Comment(_)))
    }
}

/// One page's batch of notifications.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// The page the notifications are addressed to.
    pub page_id: PageId,

    /// Platform timestamp of the batch (milliseconds), if present.
    pub time: Option<i64>,

    /// Messaging items in delivery order.
    pub messaging: Vec<MessagingItem>,

    /// Feed changes in delivery order.
    pub changes: Vec<Change>,
}

/// An item of an entry's `messaging` array.
#[derive(Debug, Clone, PartialEq)]
pub enum MessagingItem {
    /// A direct message sent to the page.
    Message(MessagingMessage),

    /// A message the page itself sent, echoed back by the platform.
    Echo,

    /// Delivery and read receipts, postbacks, and anything newer.
    Unknown { kind: String },
}

/// A messaging item carrying a `message` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagingMessage {
    pub sender_id: Option<String>,
    pub recipient_id: Option<String>,
    pub timestamp: Option<i64>,
    pub message_id: Option<String>,
    pub text: Option<String>,
    pub attachments: Vec<Attachment>,

    /// The item exactly as delivered.
    pub raw: Value,
}

/// An item of an entry's `changes` array.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// `field: "feed"`, `item: "comment"`.
    Comment(FeedChange),

    /// `field: "feed"`, `item: "reaction"`.
    Reaction(FeedChange),

    /// `field: "feed"`, `item: "like"` (legacy like notification).
    Like(FeedChange),

    /// Any other field/item combination.
    Unknown { field: String, item: Option<String> },
}

/// The `value` of a feed change, reduced to the fields we normalize.
///
/// Every field is optional here; whether a field is required depends on the
/// item kind and is decided by the classifier.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedChange {
    pub post_id: Option<PostId>,
    pub comment_id: Option<String>,
    pub parent_id: Option<String>,
    pub from_id: Option<String>,
    pub from_name: Option<String>,
    pub message: Option<String>,
    pub reaction_type: Option<String>,
    pub verb: Option<String>,
    pub created_time: Option<i64>,
    pub is_hidden: bool,
    pub is_private: bool,

    /// The change value exactly as delivered.
    pub raw: Value,
}
