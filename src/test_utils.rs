//! Shared test utilities: payload builders, stores with failure modes, and
//! arbitrary generators for property-based testing.

use std::io;
use std::time::Duration;

use proptest::prelude::*;
use serde_json::{Value, json};

use crate::persistence::{DocumentFilter, DocumentStore, MemoryStore, StoreError, StoredDocument};
use crate::types::PostId;
use crate::webhooks::{Attachment, CommentData, EventData, LikeData, MessageData, ReactionData};

pub const TEST_PAGE: &str = "1000";
pub const TEST_VERIFY_TOKEN: &str = "verify-token";

// ─── Payload builders ───

pub fn comment_change(post_id: &str, from: &str, text: &str) -> Value {
    json!({
        "field": "feed",
        "value": {
            "item": "comment",
            "verb": "add",
            "post_id": post_id,
            "comment_id": format!("{}_{}", post_id, text.len()),
            "from": { "id": from, "name": "Commenter" },
            "message": text,
            "created_time": 1_700_000_000
        }
    })
}

/// A feed comment without `post_id`.
pub fn orphan_comment_change(from: &str, text: &str) -> Value {
    json!({
        "field": "feed",
        "value": { "item": "comment", "verb": "add", "from": { "id": from }, "message": text }
    })
}

pub fn reaction_change(post_id: &str, from: &str, kind: &str) -> Value {
    json!({
        "field": "feed",
        "value": {
            "item": "reaction",
            "verb": "add",
            "reaction_type": kind,
            "post_id": post_id,
            "from": { "id": from }
        }
    })
}

pub fn message_item(sender: &str, text: &str) -> Value {
    json!({
        "sender": { "id": sender },
        "recipient": { "id": TEST_PAGE },
        "timestamp": 1_700_000_000_000i64,
        "message": { "mid": format!("m_{}", text), "text": text }
    })
}

/// A page envelope with a single entry.
pub fn envelope(page_id: &str, messaging: Vec<Value>, changes: Vec<Value>) -> Value {
    json!({
        "object": "page",
        "entry": [{
            "id": page_id,
            "time": 1_700_000_000_000i64,
            "messaging": messaging,
            "changes": changes
        }]
    })
}

pub fn body(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}

// ─── Stores ───

/// A store whose every call fails.
pub struct FailingStore;

impl DocumentStore for FailingStore {
    fn insert(&self, _doc: &StoredDocument) -> Result<(), StoreError> {
        Err(StoreError::Io(io::Error::other("store offline")))
    }

    fn find(&self, _filter: &DocumentFilter) -> Result<Vec<StoredDocument>, StoreError> {
        Err(StoreError::Io(io::Error::other("store offline")))
    }
}

/// An in-memory store that blocks for `delay` on every insert.
pub struct SlowStore {
    pub inner: MemoryStore,
    pub delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        SlowStore {
            inner: MemoryStore::new(),
            delay,
        }
    }
}

impl DocumentStore for SlowStore {
    fn insert(&self, doc: &StoredDocument) -> Result<(), StoreError> {
        std::thread::sleep(self.delay);
        self.inner.insert(doc)
    }

    fn find(&self, filter: &DocumentFilter) -> Result<Vec<StoredDocument>, StoreError> {
        self.inner.find(filter)
    }
}

// ─── Generators ───

pub fn arb_comment_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,40}".prop_map(String::from)
}

/// A mix of comments, reactions and likes on the test page.
pub fn arb_feed_change() -> impl Strategy<Value = Value> {
    prop_oneof![
        (1u32..1000, arb_comment_text())
            .prop_map(|(n, t)| comment_change(&format!("{}_{}", TEST_PAGE, n), "77", &t)),
        (1u32..1000, prop_oneof![Just("love"), Just("haha"), Just("like")])
            .prop_map(|(n, k)| reaction_change(&format!("{}_{}", TEST_PAGE, n), "78", k)),
        arb_comment_text().prop_map(|t| orphan_comment_change("79", &t)),
    ]
}

fn arb_opt_word() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[a-z0-9_]{1,12}")
}

fn arb_post_id() -> impl Strategy<Value = PostId> {
    (1u32..1000).prop_map(|n| PostId::new(format!("{}_{}", TEST_PAGE, n)))
}

fn arb_attachment() -> impl Strategy<Value = Attachment> {
    (
        prop_oneof![Just("image"), Just("file"), Just("audio")],
        proptest::option::of("https://cdn\\.example/[a-z]{1,8}"),
    )
        .prop_map(|(kind, url)| Attachment {
            kind: kind.to_string(),
            url,
        })
}

/// Any event payload, one branch per event type.
pub fn arb_event_data() -> impl Strategy<Value = EventData> {
    let message = (
        "[0-9]{1,6}",
        arb_opt_word(),
        proptest::option::of(arb_comment_text()),
        prop::collection::vec(arb_attachment(), 0..3),
        proptest::option::of(0i64..2_000_000_000_000),
    )
        .prop_map(|(sender_id, message_id, text, attachments, timestamp)| {
            EventData::Message(MessageData {
                sender_id,
                recipient_id: TEST_PAGE.to_string(),
                message_id,
                text,
                attachments,
                timestamp,
            })
        });

    let comment = (
        arb_post_id(),
        arb_opt_word(),
        "[0-9]{1,6}",
        arb_opt_word(),
        proptest::option::of(arb_comment_text()),
        arb_opt_word(),
        proptest::option::of(0i64..2_000_000_000),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|fields| {
            let (
                post_id,
                comment_id,
                sender_id,
                sender_name,
                message,
                parent_id,
                created_time,
                is_hidden,
                is_private,
            ) = fields;
            EventData::Comment(CommentData {
                post_id,
                comment_id,
                sender_id,
                sender_name,
                message,
                parent_id,
                created_time,
                verb: Some("add".to_string()),
                is_hidden,
                is_private,
            })
        });

    let reaction = (
        arb_post_id(),
        "[0-9]{1,6}",
        arb_opt_word(),
        prop_oneof![Just("love"), Just("haha"), Just("wow"), Just("sad")],
        proptest::option::of(0i64..2_000_000_000),
    )
        .prop_map(|(post_id, sender_id, sender_name, kind, created_time)| {
            EventData::Reaction(ReactionData {
                post_url: post_id.post_url(),
                post_id,
                sender_id,
                sender_name,
                reaction_type: kind.to_string(),
                verb: Some("add".to_string()),
                created_time,
            })
        });

    let like = (
        arb_post_id(),
        "[0-9]{1,6}",
        arb_opt_word(),
        proptest::option::of(0i64..2_000_000_000),
    )
        .prop_map(|(post_id, sender_id, sender_name, created_time)| {
            EventData::Like(LikeData {
                post_url: post_id.post_url(),
                post_id,
                sender_id,
                sender_name,
                verb: None,
                created_time,
            })
        });

    prop_oneof![message, comment, reaction, like]
}
