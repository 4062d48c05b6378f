//! Shared fixtures for command tests.

use super::save_state;
use mosync_engine::{
    ManagedObjectSpec, MockTransport, ObjectConfig, ReconcileConfig, Reconciler, ResponseTree,
    RetryPolicy,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A reconciler over a scripted transport that never waits or retries.
pub fn reconciler() -> Reconciler<MockTransport> {
    Reconciler::new(
        ReconcileConfig::with_retry(RetryPolicy::no_retry()),
        MockTransport::new(),
    )
}

/// Writes a tenant manifest and returns its path.
pub fn write_manifest(dir: &Path, dn: &str, descr: &str) -> PathBuf {
    let path = dir.join("manifest.json");
    let manifest = serde_json::json!({
        "dn": dn,
        "class_name": "fvTenant",
        "content": { "descr": descr }
    });
    fs::write(&path, manifest.to_string()).unwrap();
    path
}

/// Records an existing tenant in a state file and returns its path.
pub fn write_state(dir: &Path, dn: &str, descr: &str) -> PathBuf {
    let path = dir.join("state.json");
    let mut content = BTreeMap::new();
    content.insert("descr".into(), Value::String(descr.into()));
    let config = ObjectConfig {
        dn: dn.into(),
        class_name: "fvTenant".into(),
        content,
        identity: Some(dn.into()),
        ..Default::default()
    };
    save_state(&path, &ManagedObjectSpec::try_from(config).unwrap()).unwrap();
    path
}

/// A GET response carrying one tenant.
pub fn tenant(dn: &str, descr: &str) -> ResponseTree {
    let mut attrs = Map::new();
    attrs.insert("dn".into(), Value::String(dn.into()));
    attrs.insert("descr".into(), Value::String(descr.into()));
    ResponseTree::with_object("fvTenant", attrs)
}
