//! CLI command implementations.

pub mod apply;
pub mod delete;
pub mod read;

#[cfg(test)]
mod fixtures;

use mosync_engine::ManagedObjectSpec;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Result type for commands.
pub type CommandResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Human-readable text.
    Text,
    /// The object as JSON.
    Json,
}

impl Format {
    /// Parses a `--format` value.
    pub fn parse(value: &str) -> CommandResult<Self> {
        match value {
            "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            other => Err(format!("unknown format {other:?} (expected text or json)").into()),
        }
    }
}

/// Loads an object manifest.
pub fn load_manifest(path: &Path) -> CommandResult<ManagedObjectSpec> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read manifest {}: {e}", path.display()))?;
    let spec: ManagedObjectSpec = serde_json::from_str(&text)
        .map_err(|e| format!("invalid manifest {}: {e}", path.display()))?;
    Ok(spec)
}

/// Loads the recorded state, if the state file exists.
pub fn load_state(path: &Path) -> CommandResult<Option<ManagedObjectSpec>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    let spec = serde_json::from_str(&text)
        .map_err(|e| format!("invalid state file {}: {e}", path.display()))?;
    Ok(Some(spec))
}

/// Writes the recorded state.
pub fn save_state(path: &Path, spec: &ManagedObjectSpec) -> CommandResult<()> {
    let text = serde_json::to_string_pretty(spec)?;
    fs::write(path, text + "\n")?;
    Ok(())
}

/// Keys whose value differs between two attribute maps, with both values.
pub fn drift(
    before: &BTreeMap<String, String>,
    after: &BTreeMap<String, String>,
) -> Vec<(String, Option<String>, Option<String>)> {
    let mut keys: Vec<&String> = before.keys().chain(after.keys()).collect();
    keys.sort();
    keys.dedup();
    keys.into_iter()
        .filter(|k| before.get(*k) != after.get(*k))
        .map(|k| (k.clone(), before.get(k).cloned(), after.get(k).cloned()))
        .collect()
}

/// Prints an object in the requested format.
pub fn print_object(spec: &ManagedObjectSpec, format: Format) -> CommandResult<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(spec)?),
        Format::Text => {
            println!("{} ({})", spec.dn(), spec.class_name());
            println!(
                "  state: {}",
                if spec.exists() { "present" } else { "absent" }
            );
            for (key, value) in &spec.attributes {
                let marker = if spec.ignored_attribute_keys.contains(key) {
                    " (ignored)"
                } else {
                    ""
                };
                println!("  {key} = {value:?}{marker}");
            }
        }
    }
    Ok(())
}

/// Prints drift between the values before and after an operation.
pub fn print_drift(before: &BTreeMap<String, String>, after: &BTreeMap<String, String>) {
    let changes = drift(before, after);
    if changes.is_empty() {
        println!("No drift");
        return;
    }
    println!("Drift:");
    for (key, old, new) in changes {
        println!(
            "  {key}: {} -> {}",
            old.as_deref().unwrap_or("<unset>"),
            new.as_deref().unwrap_or("<unset>")
        );
    }
}
