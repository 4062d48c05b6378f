//! The `imdata` response envelope.

use crate::error::{ProtocolError, ProtocolResult};
use serde_json::{Map, Value};

/// Key of the result-entry sequence in every response.
pub const IMDATA: &str = "imdata";
/// Key holding an entry's attribute mapping under its class tag.
pub const ATTRIBUTES: &str = "attributes";
/// Class tag of error entries.
pub const ERROR_CLASS: &str = "error";

/// A parsed response from the management API.
///
/// The envelope looks like:
///
/// ```json
/// { "totalCount": "1",
///   "imdata": [ { "fvTenant": { "attributes": { "name": "demo" } } } ] }
/// ```
///
/// Error responses carry an entry tagged `error` whose attributes hold a
/// `code` and a `text`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseTree {
    root: Value,
}

/// The `code`/`text` pair of an `error` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    /// Numeric error code, `0` when the remote sent no parsable code.
    pub code: u32,
    /// Human-readable message.
    pub text: String,
}

impl ResponseTree {
    /// Wraps a JSON value, checking that it is an `imdata` envelope.
    pub fn from_value(root: Value) -> ProtocolResult<Self> {
        match root.get(IMDATA) {
            Some(Value::Array(_)) => Ok(Self { root }),
            Some(_) => Err(ProtocolError::InvalidEnvelope(format!(
                "{IMDATA} is not an array"
            ))),
            None => Err(ProtocolError::InvalidEnvelope(format!("missing {IMDATA}"))),
        }
    }

    /// Parses a response body.
    pub fn parse(body: &str) -> ProtocolResult<Self> {
        Self::from_value(serde_json::from_str(body)?)
    }

    /// Returns an envelope with no entries.
    pub fn empty() -> Self {
        Self {
            root: serde_json::json!({ "totalCount": "0", IMDATA: [] }),
        }
    }

    /// Returns a one-entry envelope holding `attributes` under `class_name`.
    pub fn with_object(class_name: &str, attributes: Map<String, Value>) -> Self {
        Self {
            root: serde_json::json!({
                "totalCount": "1",
                IMDATA: [ { class_name: { ATTRIBUTES: attributes } } ],
            }),
        }
    }

    /// Returns a one-entry error envelope.
    pub fn with_error(code: u32, text: &str) -> Self {
        Self {
            root: serde_json::json!({
                "totalCount": "1",
                IMDATA: [ { ERROR_CLASS: { ATTRIBUTES: { "code": code.to_string(), "text": text } } } ],
            }),
        }
    }

    /// Returns the underlying JSON.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Returns the result entries.
    pub fn entries(&self) -> &[Value] {
        self.root
            .get(IMDATA)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns true when the response holds no data at all.
    ///
    /// That is the case when the first entry is the empty object `{}`, or
    /// when there are no entries.
    pub fn is_empty_result(&self) -> bool {
        match self.entries().first() {
            None => true,
            Some(Value::Object(entry)) => entry.is_empty(),
            Some(_) => false,
        }
    }

    /// Returns the first `error` entry, if any.
    pub fn error_entry(&self) -> Option<ErrorEntry> {
        let attrs = self.entries().iter().find_map(|entry| {
            entry
                .get(ERROR_CLASS)
                .and_then(|e| e.get(ATTRIBUTES))
                .and_then(Value::as_object)
        })?;

        let code = match attrs.get("code") {
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()).unwrap_or(0),
            _ => 0,
        };
        let text = attrs
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Some(ErrorEntry { code, text })
    }

    /// Returns the attribute mapping of the first entry tagged `class_name`.
    pub fn attributes(&self, class_name: &str) -> Option<&Map<String, Value>> {
        self.entries().iter().find_map(|entry| {
            entry
                .get(class_name)
                .and_then(|c| c.get(ATTRIBUTES))
                .and_then(Value::as_object)
        })
    }

    /// Collects `key` from every entry tagged `class_name`.
    pub fn search(&self, class_name: &str, key: &str) -> Vec<&Value> {
        self.entries()
            .iter()
            .filter_map(|entry| {
                entry
                    .get(class_name)
                    .and_then(|c| c.get(ATTRIBUTES))
                    .and_then(|a| a.get(key))
            })
            .collect()
    }

    /// Returns the raw serialized form of `key` under `class_name`.
    ///
    /// A single match serializes as the value itself (`"x"`), several as a
    /// list (`["x","y"]`). Returns `None` when no entry has the key.
    pub fn search_raw(&self, class_name: &str, key: &str) -> Option<String> {
        match self.search(class_name, key).as_slice() {
            [] => None,
            [single] => Some(single.to_string()),
            many => Some(Value::Array(many.iter().map(|v| (*v).clone()).collect()).to_string()),
        }
    }
}
