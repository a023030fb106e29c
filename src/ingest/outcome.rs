//! Result of processing one delivery.

use thiserror::Error;

use crate::webhooks::{ParseError, VerifyError};

/// What happened to a delivery. Mapped to an HTTP response in one place,
/// by the server.
#[derive(Debug)]
pub enum Outcome {
    /// Every recognized event was stored and confirmed.
    Success { stored: usize },

    /// Some items failed classification or persistence. Whatever could be
    /// stored was stored.
    PartialFailure { stored: usize, errors: Vec<String> },

    /// The delivery was refused before touching persistence.
    Rejected(Rejection),
}

impl Outcome {
    pub fn stored(&self) -> usize {
        match self {
            Outcome::Success { stored } | Outcome::PartialFailure { stored, .. } => *stored,
            Outcome::Rejected(_) => 0,
        }
    }
}

/// Reasons a delivery is refused outright.
#[derive(Debug, Error)]
pub enum Rejection {
    /// Signature header missing or not matching the body.
    #[error("invalid payload signature")]
    InvalidSignature,

    /// An entry names a page this service does not serve.
    #[error(transparent)]
    Forbidden(VerifyError),

    /// The body is not a page webhook envelope.
    #[error(transparent)]
    Malformed(#[from] ParseError),
}
