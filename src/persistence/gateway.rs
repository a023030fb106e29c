//! Async persistence gateway.
//!
//! The gateway turns classified items into stored documents and runs the
//! blocking store calls on tokio's blocking pool. It owns the two-step write
//! protocol: an `event_in` record first, then exactly one confirmation that
//! refers back to it by `record_id`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info};

use crate::types::{PageId, RecordId};
use crate::webhooks::{Classified, EventData, EventType, LogType};

use super::document::{DocumentFilter, StoredDocument};
use super::store::{DocumentStore, Result};

/// What an `event_in` record carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// A normalized event.
    Event(EventData),

    /// A recognized item that failed classification.
    Unclassified {
        event_type: EventType,
        raw: Value,
        error: String,
    },
}

impl Incoming {
    pub fn event_type(&self) -> EventType {
        match self {
            Incoming::Event(data) => data.event_type(),
            Incoming::Unclassified { event_type, .. } => *event_type,
        }
    }

    /// Returns true if the confirmation for this record must be forced.
    pub fn needs_force(&self) -> bool {
        matches!(self, Incoming::Unclassified { .. })
    }
}

impl From<Classified> for Incoming {
    fn from(classified: Classified) -> Self {
        match classified {
            Classified::Event(event) => Incoming::Event(event.data),
            Classified::Rejected(item) => Incoming::Unclassified {
                event_type: item.event_type,
                raw: item.raw,
                error: item.error.to_string(),
            },
        }
    }
}

/// Identifies a written `event_in` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordReceipt {
    pub record_id: RecordId,
    pub time_id: DateTime<Utc>,
    pub page_id: PageId,
    pub event_type: EventType,
}

/// Shared handle to the document store.
#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn DocumentStore>,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        PersistenceGateway { store }
    }

    /// Appends an `event_in` record.
    pub async fn record_incoming(
        &self,
        time_id: DateTime<Utc>,
        page_id: PageId,
        incoming: Incoming,
    ) -> Result<RecordReceipt> {
        let event_type = incoming.event_type();
        let (data, raw, error) = match incoming {
            Incoming::Event(data) => (Some(data.to_value()?), None, None),
            Incoming::Unclassified { raw, error, .. } => (None, Some(raw), Some(error)),
        };

        let doc = StoredDocument {
            record_id: RecordId::generate(),
            log_type: LogType::EventIn,
            time_id,
            page_id,
            event_type: Some(event_type),
            data,
            raw,
            confirms: None,
            error,
        };
        let receipt = RecordReceipt {
            record_id: doc.record_id.clone(),
            time_id,
            page_id: doc.page_id.clone(),
            event_type,
        };

        self.insert(doc).await?;
        info!(
            page_id = %receipt.page_id,
            record_id = %receipt.record_id,
            event_type = %event_type,
            "Stored incoming event"
        );
        Ok(receipt)
    }

    /// Appends the confirmation of a previously written `event_in` record.
    pub async fn record_confirmation(
        &self,
        receipt: &RecordReceipt,
        forced: bool,
    ) -> Result<RecordId> {
        let log_type = if forced {
            LogType::EventForceConfirm
        } else {
            LogType::EventConfirm
        };
        let doc = StoredDocument {
            record_id: RecordId::generate(),
            log_type,
            time_id: receipt.time_id,
            page_id: receipt.page_id.clone(),
            event_type: Some(receipt.event_type),
            data: None,
            raw: None,
            confirms: Some(receipt.record_id.clone()),
            error: None,
        };
        let record_id = doc.record_id.clone();

        self.insert(doc).await?;
        debug!(
            page_id = %receipt.page_id,
            record_id = %record_id,
            confirms = %receipt.record_id,
            forced,
            "Stored confirmation"
        );
        Ok(record_id)
    }

    /// Runs a query on the blocking pool.
    pub async fn find(&self, filter: DocumentFilter) -> Result<Vec<StoredDocument>> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.find(&filter)).await?
    }

    async fn insert(&self, doc: StoredDocument) -> Result<()> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.insert(&doc)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::types::PostId;
    use crate::test_utils::arb_event_data;
    use crate::webhooks::{
        Attachment, ClassifyError, CommentData, MessageData, NormalizedEvent, RejectedItem,
    };
    use proptest::prelude::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        "2026-05-05T05:05:05Z".parse().unwrap()
    }

    fn comment_event() -> NormalizedEvent {
        NormalizedEvent {
            time_id: now(),
            page_id: PageId::new("42"),
            data: EventData::Comment(CommentData {
                post_id: PostId::new("42_1"),
                comment_id: Some("42_1_9".to_string()),
                sender_id: "7".to_string(),
                sender_name: Some("Dee".to_string()),
                message: Some("hello".to_string()),
                parent_id: None,
                created_time: Some(1_700_000_000),
                verb: Some("add".to_string()),
                is_hidden: false,
                is_private: false,
            }),
        }
    }

    fn gateway() -> (PersistenceGateway, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (PersistenceGateway::new(store.clone()), store)
    }

    #[tokio::test]
    async fn confirmation_follows_and_references_event_in() {
        let (gateway, store) = gateway();
        let event = comment_event();

        let receipt = gateway
            .record_incoming(now(), event.page_id.clone(), Classified::Event(event).into())
            .await
            .unwrap();
        let confirm_id = gateway.record_confirmation(&receipt, false).await.unwrap();

        let docs = store.snapshot().unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].log_type, LogType::EventIn);
        assert_eq!(docs[0].record_id, receipt.record_id);
        assert_eq!(docs[1].log_type, LogType::EventConfirm);
        assert_eq!(docs[1].record_id, confirm_id);
        assert_eq!(docs[1].confirms.as_ref(), Some(&receipt.record_id));
        assert_eq!(docs[1].time_id, docs[0].time_id);
        assert_eq!(docs[1].page_id, docs[0].page_id);
    }

    #[tokio::test]
    async fn stored_event_reads_back_identically() {
        let (gateway, _store) = gateway();
        let event = comment_event();

        gateway
            .record_incoming(now(), event.page_id.clone(), Classified::Event(event.clone()).into())
            .await
            .unwrap();

        let docs = gateway
            .find(DocumentFilter::page("42").with_log_type(LogType::EventIn))
            .await
            .unwrap();
        let read_back = docs[0].to_event().unwrap().unwrap();
        assert_eq!(read_back, event);
    }

    async fn round_trip(gateway: &PersistenceGateway, event: &NormalizedEvent) -> NormalizedEvent {
        gateway
            .record_incoming(now(), event.page_id.clone(), Classified::Event(event.clone()).into())
            .await
            .unwrap();
        let docs = gateway
            .find(DocumentFilter::page("42").with_log_type(LogType::EventIn))
            .await
            .unwrap();
        docs.last().unwrap().to_event().unwrap().unwrap()
    }

    #[tokio::test]
    async fn message_with_attachments_reads_back_identically() {
        let (gateway, _store) = gateway();
        let event = NormalizedEvent {
            time_id: now(),
            page_id: PageId::new("42"),
            data: EventData::Message(MessageData {
                sender_id: "55".to_string(),
                recipient_id: "42".to_string(),
                message_id: Some("m_1".to_string()),
                text: None,
                attachments: vec![
                    Attachment {
                        kind: "image".to_string(),
                        url: Some("https://cdn.example/a.png".to_string()),
                    },
                    Attachment {
                        kind: "fallback".to_string(),
                        url: None,
                    },
                ],
                timestamp: Some(1_700_000_000_123),
            }),
        };

        assert_eq!(round_trip(&gateway, &event).await, event);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_every_event_kind_reads_back_identically(data in arb_event_data()) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let (gateway, _store) = gateway();
            let event = NormalizedEvent {
                time_id: now(),
                page_id: PageId::new("42"),
                data,
            };

            let read_back = runtime.block_on(round_trip(&gateway, &event));
            prop_assert_eq!(read_back, event);
        }
    }

    #[tokio::test]
    async fn unclassified_item_is_stored_raw_and_force_confirmed() {
        let (gateway, store) = gateway();
        let rejected = RejectedItem {
            time_id: now(),
            page_id: PageId::new("42"),
            event_type: EventType::Comment,
            raw: json!({ "item": "comment", "message": "orphan" }),
            error: ClassifyError::MissingField {
                event_type: EventType::Comment,
                field: "post_id",
            },
        };

        let incoming = Incoming::from(Classified::Rejected(rejected));
        assert!(incoming.needs_force());
        let receipt = gateway
            .record_incoming(now(), PageId::new("42"), incoming)
            .await
            .unwrap();
        gateway.record_confirmation(&receipt, true).await.unwrap();

        let docs = store.snapshot().unwrap();
        assert_eq!(docs[0].data, None);
        assert_eq!(docs[0].raw.as_ref().unwrap()["message"], "orphan");
        assert_eq!(
            docs[0].error.as_deref(),
            Some("missing required field `post_id` in comment")
        );
        assert_eq!(docs[1].log_type, LogType::EventForceConfirm);
    }

    #[tokio::test]
    async fn identical_events_are_stored_separately() {
        let (gateway, store) = gateway();
        let event = comment_event();

        let a = gateway
            .record_incoming(now(), event.page_id.clone(), Classified::Event(event.clone()).into())
            .await
            .unwrap();
        let b = gateway
            .record_incoming(now(), event.page_id.clone(), Classified::Event(event).into())
            .await
            .unwrap();

        assert_ne!(a.record_id, b.record_id);
        assert_eq!(store.snapshot().unwrap().len(), 2);
    }
}
