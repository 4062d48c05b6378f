//! Apply command implementation.

use super::{load_manifest, load_state, print_drift, print_object, save_state, CommandResult, Format};
use mosync_engine::{ManagedObjectSpec, Reconciler, RestTransport};
use std::path::Path;
use tracing::info;

/// What `apply` has to do to reach the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Nothing recorded: create the object.
    Create,
    /// The recorded object is the declared one: update it.
    Update,
    /// The declared dn or class differs from the recorded object: delete
    /// the old one, then create the new one.
    Replace {
        /// Distinguished name of the recorded object.
        old_dn: String,
    },
}

/// Decides how to move from the recorded state to the manifest.
pub fn plan(declared: &ManagedObjectSpec, recorded: Option<&ManagedObjectSpec>) -> Plan {
    match recorded {
        Some(old) if !old.exists() => Plan::Create,
        Some(old) if old.dn() != declared.dn() || old.class_name() != declared.class_name() => {
            Plan::Replace {
                old_dn: old.dn().to_string(),
            }
        }
        Some(_) => Plan::Update,
        None => Plan::Create,
    }
}

/// Runs the apply command.
pub fn run<T: RestTransport>(
    reconciler: &Reconciler<T>,
    manifest: &Path,
    state: &Path,
    format: Format,
) -> CommandResult<()> {
    let mut spec = load_manifest(manifest)?;
    let recorded = load_state(state)?;
    let desired = spec.attributes.clone();

    match plan(&spec, recorded.as_ref()) {
        Plan::Create => {
            info!(dn = spec.dn(), "creating object");
            reconciler.create(&mut spec)?;
        }
        Plan::Update => {
            info!(dn = spec.dn(), "updating object");
            if let Some(old) = recorded {
                spec = adopt_identity(spec, old)?;
            }
            reconciler.update(&mut spec)?;
        }
        Plan::Replace { old_dn } => {
            info!(old = %old_dn, new = spec.dn(), "identity changed, replacing object");
            if let Some(mut old) = recorded {
                reconciler.delete(&mut old)?;
                save_state(state, &old)?;
            }
            reconciler.create(&mut spec)?;
        }
    }

    save_state(state, &spec)?;
    print_object(&spec, format)?;
    if format == Format::Text {
        print_drift(&desired, &spec.attributes);
    }
    Ok(())
}

/// Carries the recorded identity over to the freshly loaded manifest.
fn adopt_identity(
    declared: ManagedObjectSpec,
    recorded: ManagedObjectSpec,
) -> CommandResult<ManagedObjectSpec> {
    let mut config = mosync_engine::ObjectConfig::from(declared);
    config.identity = recorded.identity().map(str::to_string);
    Ok(ManagedObjectSpec::try_from(config)?)
}
