//! Event classification: typed envelope shapes to normalized events.
//!
//! Classification walks an envelope in delivery order and emits one
//! [`Classified`] value per recognized item:
//!
//! - messaging items of an entry come before its feed changes
//! - within each list, delivery order is preserved
//! - receipts, echoes, page self-comments and unrecognized changes are
//!   skipped without error
//!
//! The only failure is a recognized item that lacks a required field. Such
//! items are returned as [`Classified::Rejected`] with their raw payload so
//! the caller can still log them.

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use crate::types::PageId;

use super::envelope::{Change, Entry, FeedChange, MessagingItem, MessagingMessage, WebhookEnvelope};
use super::events::{
    CommentData, EventData, EventType, LikeData, MessageData, NormalizedEvent, ReactionData,
};

/// Reaction kind the platform uses for a plain like.
const LIKE_REACTION: &str = "like";

/// Classification failures for otherwise recognized items.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    /// A field the event kind cannot do without is absent.
    #[error("missing required field `{field}` in {event_type}")]
    MissingField {
        event_type: EventType,
        field: &'static str,
    },
}

/// Result of classifying one item.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    /// A fully normalized event.
    Event(NormalizedEvent),

    /// A recognized item that could not be normalized.
    Rejected(RejectedItem),
}

/// A recognized item that failed classification, with its raw payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedItem {
    pub time_id: DateTime<Utc>,
    pub page_id: PageId,
    pub event_type: EventType,
    pub raw: Value,
    pub error: ClassifyError,
}

/// Classifies every entry of an envelope, in order.
pub fn classify_envelope(envelope: &WebhookEnvelope, time_id: DateTime<Utc>) -> Vec<Classified> {
    envelope
        .entries
        .iter()
        .flat_map(|entry| classify_entry(entry, time_id))
        .collect()
}

/// Classifies one entry: messaging items first, then changes.
pub fn classify_entry(entry: &Entry, time_id: DateTime<Utc>) -> Vec<Classified> {
    let mut out = Vec::with_capacity(entry.messaging.len() + entry.changes.len());

    for item in &entry.messaging {
        match item {
            MessagingItem::Message(message) => {
                out.push(classify_message(entry, message, time_id));
            }
            MessagingItem::Echo => {
                trace!(page_id = %entry.page_id, "Skipping echo of page message");
            }
            MessagingItem::Unknown { kind } => {
                trace!(page_id = %entry.page_id, kind = %kind, "Skipping non-message item");
            }
        }
    }

    for change in &entry.changes {
        let classified = match change {
            Change::Comment(feed) => classify_comment(entry, feed, time_id),
            Change::Reaction(feed) => Some(classify_reaction(entry, feed, time_id)),
            Change::Like(feed) => Some(classify_like(entry, feed, time_id)),
            Change::Unknown { field, item } => {
                debug!(
                    page_id = %entry.page_id,
                    field = %field,
                    item = ?item,
                    "Skipping unrecognized change"
                );
                None
            }
        };
        out.extend(classified);
    }

    out
}

fn classify_message(entry: &Entry, message: &MessagingMessage, time_id: DateTime<Utc>) -> Classified {
    let Some(sender_id) = message.sender_id.clone() else {
        return reject(entry, EventType::Message, &message.raw, "sender.id", time_id);
    };

    accept(
        entry,
        EventData::Message(MessageData {
            sender_id,
            recipient_id: entry.page_id.to_string(),
            message_id: message.message_id.clone(),
            text: message.text.clone(),
            attachments: message.attachments.clone(),
            timestamp: message.timestamp,
        }),
        time_id,
    )
}

/// Returns `None` for comments the page wrote itself.
fn classify_comment(entry: &Entry, feed: &FeedChange, time_id: DateTime<Utc>) -> Option<Classified> {
    if feed.from_id.as_deref() == Some(entry.page_id.as_str()) {
        debug!(page_id = %entry.page_id, "Skipping comment authored by the page");
        return None;
    }

    let Some(post_id) = feed.post_id.clone() else {
        return Some(reject(entry, EventType::Comment, &feed.raw, "post_id", time_id));
    };
    let Some(sender_id) = feed.from_id.clone() else {
        return Some(reject(entry, EventType::Comment, &feed.raw, "from.id", time_id));
    };

    Some(accept(
        entry,
        EventData::Comment(CommentData {
            post_id,
            comment_id: feed.comment_id.clone(),
            sender_id,
            sender_name: feed.from_name.clone(),
            message: feed.message.clone(),
            parent_id: feed.parent_id.clone(),
            created_time: feed.created_time,
            verb: feed.verb.clone(),
            is_hidden: feed.is_hidden,
            is_private: feed.is_private,
        }),
        time_id,
    ))
}

/// A reaction whose kind is a plain like is reported as a `like` event.
fn classify_reaction(entry: &Entry, feed: &FeedChange, time_id: DateTime<Utc>) -> Classified {
    let is_like = feed
        .reaction_type
        .as_deref()
        .is_some_and(|kind| kind.eq_ignore_ascii_case(LIKE_REACTION));
    if is_like {
        return classify_like(entry, feed, time_id);
    }

    let Some(post_id) = feed.post_id.clone() else {
        return reject(entry, EventType::Reaction, &feed.raw, "post_id", time_id);
    };
    let Some(sender_id) = feed.from_id.clone() else {
        return reject(entry, EventType::Reaction, &feed.raw, "from.id", time_id);
    };
    let Some(reaction_type) = feed.reaction_type.clone() else {
        return reject(entry, EventType::Reaction, &feed.raw, "reaction_type", time_id);
    };

    let post_url = post_id.post_url();
    accept(
        entry,
        EventData::Reaction(ReactionData {
            post_id,
            sender_id,
            sender_name: feed.from_name.clone(),
            reaction_type,
            verb: feed.verb.clone(),
            created_time: feed.created_time,
            post_url,
        }),
        time_id,
    )
}

fn classify_like(entry: &Entry, feed: &FeedChange, time_id: DateTime<Utc>) -> Classified {
    let Some(post_id) = feed.post_id.clone() else {
        return reject(entry, EventType::Like, &feed.raw, "post_id", time_id);
    };
    let Some(sender_id) = feed.from_id.clone() else {
        return reject(entry, EventType::Like, &feed.raw, "from.id", time_id);
    };

    let post_url = post_id.post_url();
    accept(
        entry,
        EventData::Like(LikeData {
            post_id,
            sender_id,
            sender_name: feed.from_name.clone(),
            verb: feed.verb.clone(),
            created_time: feed.created_time,
            post_url,
        }),
        time_id,
    )
}

fn accept(entry: &Entry, data: EventData, time_id: DateTime<Utc>) -> Classified {
    Classified::Event(NormalizedEvent {
        time_id,
        page_id: entry.page_id.clone(),
        data,
    })
}

fn reject(
    entry: &Entry,
    event_type: EventType,
    raw: &Value,
    field: &'static str,
    time_id: DateTime<Utc>,
) -> Classified {
    debug!(
        page_id = %entry.page_id,
        event_type = %event_type,
        field = field,
        "Recognized item is missing a required field"
    );
    Classified::Rejected(RejectedItem {
        time_id,
        page_id: entry.page_id.clone(),
        event_type,
        raw: raw.clone(),
        error: ClassifyError::MissingField { event_type, field },
    })
}
