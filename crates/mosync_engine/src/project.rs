//! State projection.
//!
//! After a read or write, the local attribute map is rebuilt from the
//! server's response so that a caller comparing it with the desired map
//! sees exactly which server-controlled values drifted.

use crate::error::{ReconcileError, ReconcileResult};
use mosync_protocol::{normalize_raw, ResponseTree};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Rebuilds the observed attributes from `response`.
///
/// Only keys of `desired` appear in the result. Ignored keys keep their
/// desired value; every other key takes the server's value for
/// `class_name`: strings as their contents, lists joined with `,`, and
/// any remaining quote or bracket decoration removed. A key the server does
/// not report is left out.
pub fn project(
    class_name: &str,
    desired: &BTreeMap<String, String>,
    ignored: &BTreeSet<String>,
    response: &ResponseTree,
) -> ReconcileResult<BTreeMap<String, String>> {
    let mut observed = BTreeMap::new();

    for (key, value) in desired {
        if ignored.contains(key) {
            observed.insert(key.clone(), value.clone());
            continue;
        }

        let found = response.search(class_name, key);
        if found.is_empty() {
            continue;
        }
        let parts = found
            .iter()
            .map(|value| decode_value(key, value))
            .collect::<ReconcileResult<Vec<_>>>()?;
        observed.insert(key.clone(), normalize_raw(&parts.join(",")));
    }

    Ok(observed)
}

/// Decodes one server value into plain text. A list of scalars joins with `,`.
fn decode_value(key: &str, value: &Value) -> ReconcileResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Array(_) => Err(ReconcileError::decode(
                    key,
                    format!("unsupported value {value}"),
                )),
                _ => decode_value(key, item),
            })
            .collect::<ReconcileResult<Vec<_>>>()
            .map(|parts| parts.join(",")),
        Value::Object(_) | Value::Null => Err(ReconcileError::decode(
            key,
            format!("unsupported value {value}"),
        )),
    }
}

/// Projection when the server reports no object: only ignored keys survive.
pub fn project_absent(
    desired: &BTreeMap<String, String>,
    ignored: &BTreeSet<String>,
) -> BTreeMap<String, String> {
    desired
        .iter()
        .filter(|(key, _)| ignored.contains(*key))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
