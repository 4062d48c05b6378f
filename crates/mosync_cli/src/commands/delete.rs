//! Delete command implementation.

use super::{load_manifest, load_state, save_state, CommandResult};
use mosync_engine::{Reconciler, RestTransport};
use std::path::Path;

/// Runs the delete command.
pub fn run<T: RestTransport>(
    reconciler: &Reconciler<T>,
    manifest: Option<&Path>,
    state: &Path,
) -> CommandResult<()> {
    let mut spec = match (load_state(state)?, manifest) {
        (Some(spec), _) => spec,
        (None, Some(manifest)) => load_manifest(manifest)?,
        (None, None) => {
            return Err(format!(
                "no state file at {} and no --manifest given",
                state.display()
            )
            .into())
        }
    };

    reconciler.delete(&mut spec)?;
    save_state(state, &spec)?;

    println!("✓ Deleted {}", spec.dn());
    Ok(())
}
