//! Page webhook payload parser.
//!
//! This module decodes raw delivery bodies into a typed [`WebhookEnvelope`].
//! The parser is designed to be robust against unknown fields and new
//! notification kinds.
//!
//! # Parsing Strategy
//!
//! 1. The body must be valid JSON, otherwise [`ParseError::MalformedJson`]
//! 2. The top-level `object` must be `"page"` and every entry must carry an
//!    `id`, otherwise [`ParseError::UnrecognizedEnvelope`]
//! 3. Messaging items and changes are mapped onto a closed set of shapes;
//!    anything unrecognized becomes an `Unknown` variant, never an error
//! 4. Missing fields inside recognized items are left as `None` for the
//!    classifier to judge

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::types::{PageId, PostId};

use super::envelope::{Change, Entry, FeedChange, MessagingItem, MessagingMessage, WebhookEnvelope};
use super::events::Attachment;

/// The only envelope discriminator this service accepts.
pub const PAGE_OBJECT: &str = "page";

/// Error type for webhook parsing failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The body is not JSON at all.
    #[error("malformed JSON body: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// Valid JSON, but not a page envelope.
    #[error("unrecognized envelope: {reason}")]
    UnrecognizedEnvelope { reason: String },
}

impl ParseError {
    fn unrecognized(reason: impl Into<String>) -> Self {
        ParseError::UnrecognizedEnvelope {
            reason: reason.into(),
        }
    }
}

/// Parses a delivery body into a typed envelope.
///
/// # Examples
///
/// ```
/// use page_webhook::webhooks::parse_envelope;
///
/// let body = br#"{
///     "object": "page",
///     "entry": [{
///         "id": "1234",
///         "time": 1700000000000,
///         "changes": [{
///             "field": "feed",
///             "value": { "item": "comment", "post_id": "1234_1", "from": { "id": "77" } }
///         }]
///     }]
/// }"#;
///
/// let envelope = parse_envelope(body).unwrap();
/// assert_eq!(envelope.entries.len(), 1);
/// assert!(envelope.has_comment());
/// ```
pub fn parse_envelope(body: &[u8]) -> Result<WebhookEnvelope, ParseError> {
    let value: Value = serde_json::from_slice(body)?;

    if !value.is_object() {
        return Err(ParseError::unrecognized("body is not a JSON object"));
    }

    let raw: RawEnvelope =
        serde_json::from_value(value).map_err(|e| ParseError::unrecognized(e.to_string()))?;

    match raw.object.as_deref() {
        Some(PAGE_OBJECT) => {}
        Some(other) => {
            return Err(ParseError::unrecognized(format!(
                "unsupported object type `{}`",
                other
            )));
        }
        None => return Err(ParseError::unrecognized("missing `object` discriminator")),
    }

    let entries = raw
        .entry
        .unwrap_or_default()
        .into_iter()
        .map(convert_entry)
        .collect();
    Ok(WebhookEnvelope { entries })
}

// ============================================================================
// Raw payload structures for deserialization
//
// Item bodies are kept as `Value` at the entry level so that one odd item
// cannot fail the whole envelope. Each item is read field by field below.
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    object: Option<String>,
    #[serde(default)]
    entry: Option<Vec<RawEntry>>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(deserialize_with = "lenient_id")]
    id: String,
    #[serde(default)]
    time: Option<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    messaging: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    changes: Vec<Value>,
}

/// Ids arrive as strings, but some legacy payloads use bare numbers.
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// A `null` or non-array item list reads as empty.
fn lenient_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Value>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => {
            debug!(value = %other, "Ignoring non-array item list");
            Ok(Vec::new())
        }
    }
}

// ============================================================================
// Field-wise readers
//
// Each field is read on its own, so one ill-typed optional field never hides
// the others.
// ============================================================================

fn opt_id(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn opt_str(value: &Value, key: &str) -> Option<String> {
    value.get(key)?.as_str().map(str::to_string)
}

/// Accepts JSON booleans and their string spellings.
fn opt_bool(value: &Value, key: &str) -> Option<bool> {
    match value.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn timestamp(value: Option<&Value>) -> Option<i64> {
    value.and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
}

fn attachments(message: &Value) -> Vec<Attachment> {
    let Some(items) = message.get("attachments").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter(|item| item.is_object())
        .map(|item| Attachment {
            kind: opt_str(item, "type").unwrap_or_default(),
            url: item.get("payload").and_then(|p| opt_str(p, "url")),
        })
        .collect()
}

// ============================================================================
// Conversion to typed shapes
// ============================================================================

fn convert_entry(raw: RawEntry) -> Entry {
    Entry {
        page_id: PageId::new(raw.id),
        time: timestamp(raw.time.as_ref()),
        messaging: raw.messaging.into_iter().map(convert_messaging).collect(),
        changes: raw.changes.into_iter().map(convert_change).collect(),
    }
}

fn convert_messaging(value: Value) -> MessagingItem {
    let Some(message) = value.get("message").filter(|m| m.is_object()) else {
        return MessagingItem::Unknown {
            kind: messaging_kind(&value),
        };
    };

    if opt_bool(message, "is_echo").unwrap_or(false) {
        return MessagingItem::Echo;
    }

    let party_id = |key: &str| value.get(key).and_then(|party| opt_id(party, "id"));

    MessagingItem::Message(MessagingMessage {
        sender_id: party_id("sender"),
        recipient_id: party_id("recipient"),
        timestamp: timestamp(value.get("timestamp")),
        message_id: opt_str(message, "mid"),
        text: opt_str(message, "text"),
        attachments: attachments(message),
        raw: value.clone(),
    })
}

/// Names a non-message messaging item after the first notification key it carries.
fn messaging_kind(value: &Value) -> String {
    const KNOWN: [&str; 6] = [
        "delivery",
        "read",
        "postback",
        "reaction",
        "referral",
        "optin",
    ];
    KNOWN
        .iter()
        .find(|key| value.get(**key).is_some())
        .map(|key| key.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn convert_change(change: Value) -> Change {
    let field = opt_str(&change, "field").unwrap_or_default();
    let value = match change {
        Value::Object(mut map) => map.remove("value").unwrap_or(Value::Null),
        other => {
            debug!(change = %other, "Non-object change item");
            Value::Null
        }
    };
    let item = opt_str(&value, "item");

    if field == "feed" && value.is_object() {
        match item.as_deref() {
            Some("comment") => return Change::Comment(feed_change(value)),
            Some("reaction") => return Change::Reaction(feed_change(value)),
            Some("like") => return Change::Like(feed_change(value)),
            _ => {}
        }
    }

    Change::Unknown { field, item }
}

fn feed_change(value: Value) -> FeedChange {
    let from = value.get("from");

    FeedChange {
        post_id: opt_id(&value, "post_id").map(PostId::new),
        comment_id: opt_id(&value, "comment_id"),
        parent_id: opt_id(&value, "parent_id"),
        from_id: from.and_then(|f| opt_id(f, "id")),
        from_name: from.and_then(|f| opt_str(f, "name")),
        message: opt_str(&value, "message"),
        reaction_type: opt_str(&value, "reaction_type"),
        verb: opt_str(&value, "verb"),
        created_time: timestamp(value.get("created_time")),
        is_hidden: opt_bool(&value, "is_hidden").unwrap_or(false),
        is_private: opt_bool(&value, "is_private").unwrap_or(false),
        raw: value,
    }
}
