//! Write payloads.

use crate::error::{ProtocolError, ProtocolResult};
use crate::tree::ATTRIBUTES;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Attribute key that carries the lifecycle hint.
const STATUS_KEY: &str = "status";

/// Lifecycle hint written into a payload's `status` attribute.
///
/// Some API generations use the hint to tell create-or-update apart from
/// delete over the same POST verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleStatus {
    /// Create the object, or update it if it already exists.
    CreatedModified,
    /// Update an existing object.
    Modified,
    /// Remove the object.
    Deleted,
}

impl LifecycleStatus {
    /// Returns the wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::CreatedModified => "created,modified",
            LifecycleStatus::Modified => "modified",
            LifecycleStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        match normalized.as_str() {
            "created,modified" | "modified,created" => Ok(LifecycleStatus::CreatedModified),
            "modified" => Ok(LifecycleStatus::Modified),
            "deleted" => Ok(LifecycleStatus::Deleted),
            other => Err(format!("unknown lifecycle status: {other}")),
        }
    }
}

/// The body of a POST: `{ <class>: { "attributes": { ... } } }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    class_name: String,
    body: Value,
}

impl Payload {
    /// Builds a payload for `class_name` from a flat attribute map.
    ///
    /// Fails with [`ProtocolError::MalformedAttribute`] when a key is empty
    /// or a key or value holds a control character, since neither survives
    /// as a remote attribute string.
    pub fn build(
        class_name: &str,
        attributes: &BTreeMap<String, String>,
        status: Option<LifecycleStatus>,
    ) -> ProtocolResult<Self> {
        let mut attrs = Map::with_capacity(attributes.len() + 1);
        for (key, value) in attributes {
            check_attribute(key, value)?;
            attrs.insert(key.clone(), Value::String(value.clone()));
        }

        let mut body = Map::new();
        let mut inner = Map::new();
        inner.insert(ATTRIBUTES.to_string(), Value::Object(attrs));
        body.insert(class_name.to_string(), Value::Object(inner));

        let mut payload = Self {
            class_name: class_name.to_string(),
            body: Value::Object(body),
        };
        if let Some(status) = status {
            payload.set_status(status);
        }
        Ok(payload)
    }

    /// Writes `status` into the payload's attributes, replacing any value.
    pub fn set_status(&mut self, status: LifecycleStatus) {
        if let Some(attrs) = self
            .body
            .get_mut(&self.class_name)
            .and_then(|c| c.get_mut(ATTRIBUTES))
            .and_then(Value::as_object_mut)
        {
            attrs.insert(STATUS_KEY.to_string(), Value::String(status.to_string()));
        }
    }

    /// Returns the lifecycle hint, if one is set.
    pub fn status(&self) -> Option<LifecycleStatus> {
        self.attributes()?
            .get(STATUS_KEY)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }

    /// Returns the class tag.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Returns the attribute mapping.
    pub fn attributes(&self) -> Option<&Map<String, Value>> {
        self.body
            .get(&self.class_name)
            .and_then(|c| c.get(ATTRIBUTES))
            .and_then(Value::as_object)
    }

    /// Returns the full JSON body.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Serializes the body for sending.
    pub fn to_json(&self) -> String {
        self.body.to_string()
    }
}

fn check_attribute(key: &str, value: &str) -> ProtocolResult<()> {
    if key.is_empty() {
        return Err(ProtocolError::malformed(key, "empty attribute key"));
    }
    if key.chars().any(char::is_control) {
        return Err(ProtocolError::malformed(key, "key contains a control character"));
    }
    if value.chars().any(char::is_control) {
        return Err(ProtocolError::malformed(key, "value contains a control character"));
    }
    Ok(())
}
