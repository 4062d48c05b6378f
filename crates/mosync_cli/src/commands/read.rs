//! Read command implementation.

use super::{load_state, print_drift, print_object, save_state, CommandResult, Format};
use mosync_engine::{Reconciler, RestTransport};
use std::path::Path;

/// Runs the read command.
pub fn run<T: RestTransport>(
    reconciler: &Reconciler<T>,
    state: &Path,
    format: Format,
) -> CommandResult<()> {
    let mut spec = load_state(state)?
        .ok_or_else(|| format!("no state file at {}; run apply first", state.display()))?;
    let before = spec.attributes.clone();

    reconciler.read(&mut spec)?;
    save_state(state, &spec)?;

    print_object(&spec, format)?;
    if format == Format::Text {
        if spec.exists() {
            print_drift(&before, &spec.attributes);
        } else {
            println!("Object was deleted outside mosync");
        }
    }
    Ok(())
}
