//! Stored record shape.
//!
//! Every record is a flat JSON document in a single collection. The `type`
//! key tells inbound records apart from their confirmations:
//!
//! ```text
//! {"record_id":"…","type":"event_in","time_id":"…","page_id":"…","event_type":"comment","data":{…}}
//! {"record_id":"…","type":"event_confirm","time_id":"…","page_id":"…","event_type":"comment","confirms":"…"}
//! ```
//!
//! Inbound records for items that could not be classified carry `raw` and
//! `error` instead of `data`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{PageId, RecordId};
use crate::webhooks::{EventData, EventType, LogType, NormalizedEvent};

/// One persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub record_id: RecordId,

    #[serde(rename = "type")]
    pub log_type: LogType,

    pub time_id: DateTime<Utc>,

    pub page_id: PageId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,

    /// Normalized payload of an `event_in` record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Payload as delivered, for items that failed classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,

    /// The `event_in` record a confirmation refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirms: Option<RecordId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StoredDocument {
    /// Rebuilds the normalized event of an `event_in` record.
    ///
    /// Returns `Ok(None)` for confirmations and for records of items that
    /// were never normalized.
    pub fn to_event(&self) -> Result<Option<NormalizedEvent>, serde_json::Error> {
        if self.log_type != LogType::EventIn {
            return Ok(None);
        }
        let (Some(event_type), Some(data)) = (self.event_type, &self.data) else {
            return Ok(None);
        };

        let data = EventData::from_parts(event_type, data.clone())?;
        Ok(Some(NormalizedEvent {
            time_id: self.time_id,
            page_id: self.page_id.clone(),
            data,
        }))
    }
}

/// Query over stored records. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFilter {
    pub page_id: Option<PageId>,
    pub event_type: Option<EventType>,
    pub log_type: Option<LogType>,
    /// Inclusive lower bound on `time_id`.
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `time_id`.
    pub until: Option<DateTime<Utc>>,
}

impl DocumentFilter {
    pub fn page(page_id: impl Into<PageId>) -> Self {
        DocumentFilter {
            page_id: Some(page_id.into()),
            ..Default::default()
        }
    }

    pub fn with_event_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    pub fn with_log_type(mut self, log_type: LogType) -> Self {
        self.log_type = Some(log_type);
        self
    }

    pub fn between(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }

    pub fn matches(&self, doc: &StoredDocument) -> bool {
        self.page_id.as_ref().is_none_or(|p| *p == doc.page_id)
            && self.event_type.is_none_or(|t| doc.event_type == Some(t))
            && self.log_type.is_none_or(|t| doc.log_type == t)
            && self.since.is_none_or(|s| doc.time_id >= s)
            && self.until.is_none_or(|u| doc.time_id < u)
    }
}
