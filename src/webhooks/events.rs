//! Normalized page events.
//!
//! A [`NormalizedEvent`] is the durable unit produced by the classifier: one
//! per recognized message or feed change. Events are immutable once built and
//! are written to the store exactly as they are here.
//!
//! # Event Types
//!
//! - `message` - a direct message to the page
//! - `comment` - a comment on one of the page's posts
//! - `reaction` - a reaction other than a plain like
//! - `like` - a plain like on a post

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{PageId, PostId};

/// The closed set of event kinds the service stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Message,
    Comment,
    Reaction,
    Like,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Message => "message",
            EventType::Comment => "comment",
            EventType::Reaction => "reaction",
            EventType::Like => "like",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log classification of a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogType {
    /// The event as received.
    EventIn,
    /// Acknowledgment written after the event was stored and classified.
    EventConfirm,
    /// Acknowledgment written for an event that could not be fully classified.
    EventForceConfirm,
}

impl LogType {
    /// Returns true for both confirmation kinds.
    pub fn is_confirmation(&self) -> bool {
        matches!(self, LogType::EventConfirm | LogType::EventForceConfirm)
    }
}

/// A message attachment (image, file, audio, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Attachment kind as reported by the platform.
    #[serde(rename = "type")]
    pub kind: String,

    /// Download URL, when the platform provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Payload of a `message` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageData {
    pub sender_id: String,
    /// Always the receiving page.
    pub recipient_id: String,
    pub message_id: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Platform timestamp in milliseconds.
    pub timestamp: Option<i64>,
}

/// Payload of a `comment` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentData {
    pub post_id: PostId,
    pub comment_id: Option<String>,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub message: Option<String>,
    /// Set when the comment replies to another comment.
    pub parent_id: Option<String>,
    pub created_time: Option<i64>,
    /// `add`, `edited` or `remove`.
    pub verb: Option<String>,
    #[serde(default)]
    pub is_hidden: bool,
    /// Set for comments only visible to the page and the author.
    #[serde(default)]
    pub is_private: bool,
}

/// Payload of a `reaction` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionData {
    pub post_id: PostId,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub reaction_type: String,
    pub verb: Option<String>,
    pub created_time: Option<i64>,
    pub post_url: String,
}

/// Payload of a `like` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeData {
    pub post_id: PostId,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub verb: Option<String>,
    pub created_time: Option<i64>,
    pub post_url: String,
}

/// Event payload, one variant per [`EventType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventData {
    Message(MessageData),
    Comment(CommentData),
    Reaction(ReactionData),
    Like(LikeData),
}

impl EventData {
    pub fn event_type(&self) -> EventType {
        match self {
            EventData::Message(_) => EventType::Message,
            EventData::Comment(_) => EventType::Comment,
            EventData::Reaction(_) => EventType::Reaction,
            EventData::Like(_) => EventType::Like,
        }
    }

    /// Serializes the payload without its type tag, as stored under `data`.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            EventData::Message(d) => serde_json::to_value(d),
            EventData::Comment(d) => serde_json::to_value(d),
            EventData::Reaction(d) => serde_json::to_value(d),
            EventData::Like(d) => serde_json::to_value(d),
        }
    }

    /// Rebuilds a payload from its stored `event_type` and `data`.
    pub fn from_parts(event_type: EventType, data: Value) -> Result<Self, serde_json::Error> {
        Ok(match event_type {
            EventType::Message => EventData::Message(serde_json::from_value(data)?),
            EventType::Comment => EventData::Comment(serde_json::from_value(data)?),
            EventType::Reaction => EventData::Reaction(serde_json::from_value(data)?),
            EventType::Like => EventData::Like(serde_json::from_value(data)?),
        })
    }
}

/// A classified event ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    /// When the delivery carrying this event was received.
    pub time_id: DateTime<Utc>,

    /// The page owning the event.
    pub page_id: PageId,

    pub data: EventData,
}

impl NormalizedEvent {
    pub fn event_type(&self) -> EventType {
        self.data.event_type()
    }
}
