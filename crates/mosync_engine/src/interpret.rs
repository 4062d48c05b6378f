//! Response interpretation.
//!
//! A response is classified on its own first (`classify`), then judged in
//! the light of the operation that produced it (`interpret`). The only
//! operation-dependent rule lives in [`BENIGN_REMOTE_ERRORS`].

use crate::error::{ReconcileError, ReconcileResult};
use crate::operation::Operation;
use mosync_protocol::{ErrorEntry, ResponseTree};

/// Remote error codes that mean "already absent" for a given operation.
///
/// Deletes race with earlier partial applies, and the API reports deleting
/// a missing object as an error rather than a no-op.
const BENIGN_REMOTE_ERRORS: &[(Operation, u32)] = &[
    (Operation::Delete, 1),
    (Operation::Delete, 107),
];

/// How a remote error is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The error means the operation's goal already holds.
    Benign,
    /// The error is a failure of this attempt.
    Fatal,
}

/// Looks up the severity of remote `code` for `operation`.
pub fn severity(operation: Operation, code: u32) -> Severity {
    if BENIGN_REMOTE_ERRORS.contains(&(operation, code)) {
        Severity::Benign
    } else {
        Severity::Fatal
    }
}

/// Classification of a response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No data and no error.
    NotFound,
    /// Well-formed data.
    Success,
    /// The remote rejected the request.
    RemoteError(ErrorEntry),
}

/// Classifies a response without regard to the operation.
pub fn classify(tree: &ResponseTree) -> Outcome {
    if tree.is_empty_result() {
        return Outcome::NotFound;
    }
    match tree.error_entry() {
        Some(entry) => Outcome::RemoteError(entry),
        None => Outcome::Success,
    }
}

/// What a response means for the operation that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpretation {
    /// The object is absent.
    Absent,
    /// The response carries the object's attributes.
    Present,
    /// A benign remote error: the object was already gone.
    AlreadyAbsent(ErrorEntry),
}

/// Interprets a response for `operation`.
///
/// Fails with [`ReconcileError::Remote`] for remote errors that are fatal
/// for this operation.
pub fn interpret(tree: &ResponseTree, operation: Operation) -> ReconcileResult<Interpretation> {
    match classify(tree) {
        Outcome::NotFound => Ok(Interpretation::Absent),
        Outcome::Success => Ok(Interpretation::Present),
        Outcome::RemoteError(entry) => match severity(operation, entry.code) {
            Severity::Benign => Ok(Interpretation::AlreadyAbsent(entry)),
            Severity::Fatal => Err(ReconcileError::remote(entry.code, entry.text)),
        },
    }
}
