//! Error types for the wire protocol.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while building payloads or reading response envelopes.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The response body was not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The response was JSON but not an `imdata` envelope.
    #[error("invalid response envelope: {0}")]
    InvalidEnvelope(String),

    /// An attribute cannot be sent to the remote API as a string.
    #[error("malformed attribute {key:?}: {reason}")]
    MalformedAttribute {
        /// Offending attribute key.
        key: String,
        /// Why the attribute was rejected.
        reason: String,
    },
}

impl ProtocolError {
    pub(crate) fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedAttribute {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
