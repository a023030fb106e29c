//! Newtype wrappers for platform and storage identifiers.
//!
//! These types prevent accidental mixing of different ID types (e.g., passing a
//! post id where the page id is expected) and make the code more self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The id of a Facebook Page (the account this service is subscribed for).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub String);

impl PageId {
    pub fn new(s: impl Into<String>) -> Self {
        PageId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PageId {
    fn from(s: &str) -> Self {
        PageId(s.to_string())
    }
}

impl From<String> for PageId {
    fn from(s: String) -> Self {
        PageId(s)
    }
}

/// A feed post id.
///
/// The platform encodes post ids as `<page id>_<post number>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

impl PostId {
    pub fn new(s: impl Into<String>) -> Self {
        PostId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the public URL of the post, or an empty string when the id is
    /// not of the `<page>_<post>` form.
    pub fn post_url(&self) -> String {
        match self.0.split_once('_') {
            Some((page, post)) if !page.is_empty() && !post.is_empty() => {
                format!("https://www.facebook.com/{}/posts/{}", page, post)
            }
            _ => String::new(),
        }
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a stored document.
///
/// Content is never deduplicated, so every append gets a fresh random id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(s: impl Into<String>) -> Self {
        RecordId(s.into())
    }

    /// Generates a new random record id.
    pub fn generate() -> Self {
        RecordId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
