//! Request addressing.

use std::fmt;

/// HTTP method used for one round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read an object.
    Get,
    /// Create, update, or (with a `deleted` status) remove an object.
    Post,
    /// Remove an object.
    Delete,
}

impl Method {
    /// Returns the method name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }

    /// Returns true if requests with this method carry a body.
    pub fn has_body(&self) -> bool {
        matches!(self, Method::Post)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the REST path addressing the object named `dn`.
pub fn object_path(dn: &str) -> String {
    format!("/api/mo/{dn}.json")
}
