//! The four reconciliation operations.

use mosync_protocol::{LifecycleStatus, Method};
use std::fmt;

/// A reconciliation operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create the object.
    Create,
    /// Read the object back.
    Read,
    /// Update the object in place.
    Update,
    /// Remove the object.
    Delete,
}

impl Operation {
    /// All operations, in lifecycle order.
    pub const ALL: [Operation; 4] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
    ];

    /// Returns the operation name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// Returns the lifecycle hint a write for this operation carries.
    pub fn status(&self) -> Option<LifecycleStatus> {
        match self {
            Operation::Create => Some(LifecycleStatus::CreatedModified),
            Operation::Update => Some(LifecycleStatus::Modified),
            Operation::Delete => Some(LifecycleStatus::Deleted),
            Operation::Read => None,
        }
    }

    /// Returns the method used for this operation's primary call.
    ///
    /// Delete may also go out as a POST, see
    /// [`DeleteStrategy`](crate::DeleteStrategy).
    pub fn method(&self) -> Method {
        match self {
            Operation::Create | Operation::Update => Method::Post,
            Operation::Read => Method::Get,
            Operation::Delete => Method::Delete,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
