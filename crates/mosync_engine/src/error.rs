//! Error types for reconciliation.

use crate::operation::Operation;
use mosync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Errors that can occur while reconciling a managed object.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// Connectivity or protocol failure before any interpretable response.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
    },

    /// The remote system understood the request and rejected it.
    #[error("remote error {code}: {message}")]
    Remote {
        /// Remote error code.
        code: u32,
        /// Remote error text.
        message: String,
    },

    /// An attribute could not be encoded into a write payload.
    #[error("malformed attribute {key:?}: {reason}")]
    MalformedAttributes {
        /// Offending attribute key.
        key: String,
        /// Why the attribute was rejected.
        reason: String,
    },

    /// A successful response held a value that could not be normalized.
    #[error("cannot decode attribute {key:?}: {reason}")]
    Decode {
        /// Attribute key.
        key: String,
        /// Why decoding failed.
        reason: String,
    },

    /// The object spec failed validation at the boundary.
    #[error("invalid object spec: {0}")]
    InvalidSpec(String),

    /// The operation does not apply to the object's current state.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Current state.
        from: String,
        /// Attempted operation.
        to: String,
    },

    /// An operation gave up. `source` is the error of the final attempt.
    #[error("{operation} of {dn} failed after {attempts} attempt(s): {source}")]
    Failed {
        /// Distinguished name of the object.
        dn: String,
        /// Operation that failed.
        operation: Operation,
        /// Number of attempts made.
        attempts: u32,
        /// Error from the final attempt.
        source: Box<ReconcileError>,
    },
}

impl ReconcileError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a remote error.
    pub fn remote(code: u32, message: impl Into<String>) -> Self {
        Self::Remote {
            code,
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReconcileError::Transport { .. }
                | ReconcileError::Remote { .. }
                | ReconcileError::Decode { .. }
        )
    }

    /// Returns the final-attempt error behind a [`ReconcileError::Failed`].
    pub fn root_cause(&self) -> &ReconcileError {
        match self {
            ReconcileError::Failed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Returns the remote error code, if this is (or wraps) a remote error.
    pub fn remote_code(&self) -> Option<u32> {
        match self.root_cause() {
            ReconcileError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<ProtocolError> for ReconcileError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::MalformedAttribute { key, reason } => {
                ReconcileError::MalformedAttributes { key, reason }
            }
            other => ReconcileError::transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(ReconcileError::transport("connection reset").is_retryable());
        assert!(ReconcileError::remote(400, "bad request").is_retryable());
        assert!(ReconcileError::decode("descr", "object value").is_retryable());
        assert!(!ReconcileError::MalformedAttributes {
            key: "".into(),
            reason: "empty attribute key".into()
        }
        .is_retryable());
        assert!(!ReconcileError::InvalidSpec("empty dn".into()).is_retryable());
    }

    #[test]
    fn failed_wraps_last_error() {
        let err = ReconcileError::Failed {
            dn: "uni/tn-demo".into(),
            operation: Operation::Update,
            attempts: 4,
            source: Box::new(ReconcileError::remote(122, "unknown class")),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.root_cause(), &ReconcileError::remote(122, "unknown class"));
        assert_eq!(err.remote_code(), Some(122));
        assert_eq!(
            err.to_string(),
            "update of uni/tn-demo failed after 4 attempt(s): remote error 122: unknown class"
        );
    }

    #[test]
    fn protocol_errors_map() {
        let err: ReconcileError = ProtocolError::InvalidEnvelope("missing imdata".into()).into();
        assert!(matches!(err, ReconcileError::Transport { .. }));

        let err: ReconcileError = ProtocolError::MalformedAttribute {
            key: "descr".into(),
            reason: "value contains a control character".into(),
        }
        .into();
        assert!(matches!(err, ReconcileError::MalformedAttributes { .. }));
    }
}
