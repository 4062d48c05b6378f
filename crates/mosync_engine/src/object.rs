//! The managed object being reconciled.

use crate::error::{ReconcileError, ReconcileResult};
use mosync_protocol::object_path;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Declared (and, after an operation, observed) state of one remote object.
///
/// `dn` and `class_name` are fixed at construction; changing either means
/// a different object. `attributes` carries the desired values in and the
/// observed values out. The identity is the sole existence flag: it equals
/// `dn` while the object is believed to exist and is unset otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ObjectConfig", into = "ObjectConfig")]
pub struct ManagedObjectSpec {
    dn: String,
    class_name: String,
    /// Desired attributes before an operation, observed ones after.
    pub attributes: BTreeMap<String, String>,
    /// Keys whose caller-supplied value survives projection.
    pub ignored_attribute_keys: BTreeSet<String>,
    identity: Option<String>,
}

impl ManagedObjectSpec {
    /// Creates a spec for an object that does not exist locally yet.
    pub fn new(dn: impl Into<String>, class_name: impl Into<String>) -> ReconcileResult<Self> {
        let dn = dn.into();
        let class_name = class_name.into();
        validate_dn(&dn)?;
        validate_class_name(&class_name)?;
        Ok(Self {
            dn,
            class_name,
            attributes: BTreeMap::new(),
            ignored_attribute_keys: BTreeSet::new(),
            identity: None,
        })
    }

    /// Adds a desired attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Marks a key as caller-controlled.
    pub fn with_ignored_key(mut self, key: impl Into<String>) -> Self {
        self.ignored_attribute_keys.insert(key.into());
        self
    }

    /// Returns the distinguished name.
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// Returns the class tag.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Returns the identity, set while the object is believed to exist.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Returns true while the object is believed to exist.
    pub fn exists(&self) -> bool {
        self.identity.is_some()
    }

    /// Returns the REST path of the object.
    pub fn path(&self) -> String {
        object_path(&self.dn)
    }

    pub(crate) fn mark_present(&mut self) {
        self.identity = Some(self.dn.clone());
    }

    pub(crate) fn mark_absent(&mut self) {
        self.identity = None;
    }
}

fn validate_dn(dn: &str) -> ReconcileResult<()> {
    if dn.is_empty() {
        return Err(ReconcileError::InvalidSpec("dn is empty".into()));
    }
    if dn.starts_with('/') || dn.ends_with('/') {
        return Err(ReconcileError::InvalidSpec(format!(
            "dn {dn:?} must not start or end with '/'"
        )));
    }
    if let Some(c) = dn
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || matches!(c, '?' | '#'))
    {
        return Err(ReconcileError::InvalidSpec(format!(
            "dn {dn:?} contains {c:?}"
        )));
    }
    Ok(())
}

fn validate_class_name(class_name: &str) -> ReconcileResult<()> {
    if class_name.is_empty() {
        return Err(ReconcileError::InvalidSpec("class_name is empty".into()));
    }
    if !class_name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ReconcileError::InvalidSpec(format!(
            "class_name {class_name:?} must be alphanumeric"
        )));
    }
    Ok(())
}

/// Serialized form of a [`ManagedObjectSpec`].
///
/// Used for manifests and state files. `content` accepts any JSON scalar;
/// numbers and booleans are stored as their string form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectConfig {
    /// Distinguished name.
    #[serde(alias = "distinguished_name")]
    pub dn: String,
    /// Class tag.
    pub class_name: String,
    /// Attribute map.
    #[serde(default, alias = "attributes")]
    pub content: BTreeMap<String, Value>,
    /// Keys preserved verbatim on projection.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub ignored_attribute_keys: BTreeSet<String>,
    /// Identity recorded by a previous run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
}

impl TryFrom<ObjectConfig> for ManagedObjectSpec {
    type Error = ReconcileError;

    fn try_from(config: ObjectConfig) -> ReconcileResult<Self> {
        let mut spec = ManagedObjectSpec::new(config.dn, config.class_name)?;

        for (key, value) in config.content {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(ReconcileError::MalformedAttributes {
                        key,
                        reason: format!("expected a scalar, found {other}"),
                    })
                }
            };
            spec.attributes.insert(key, value);
        }
        spec.ignored_attribute_keys = config.ignored_attribute_keys;

        match config.identity.as_deref() {
            None | Some("") => {}
            Some(id) if id == spec.dn => spec.mark_present(),
            Some(id) => {
                return Err(ReconcileError::InvalidSpec(format!(
                    "identity {id:?} does not match dn {:?}",
                    spec.dn
                )))
            }
        }

        Ok(spec)
    }
}

impl From<ManagedObjectSpec> for ObjectConfig {
    fn from(spec: ManagedObjectSpec) -> Self {
        Self {
            dn: spec.dn,
            class_name: spec.class_name,
            content: spec
                .attributes
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
            ignored_attribute_keys: spec.ignored_attribute_keys,
            identity: spec.identity,
        }
    }
}
