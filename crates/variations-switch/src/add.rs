use std::fs;
use std::path::Path;
use tracing::{info, warn};
use variations_store::{ensure_profile, validate_name, EnsureOutcome, StoreError};

use crate::{SwitchError, Workspace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Overlay folders were created and the registry has an entry.
    Created(EnsureOutcome),
    /// The overlay folder already existed; nothing was touched.
    Skipped,
}

fn create_dir(path: &Path) -> Result<(), SwitchError> {
    fs::create_dir_all(path).map_err(|source| SwitchError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Create the overlay skeleton and registry entry for one variation.
pub fn add_variation(workspace: &Workspace, name: &str) -> Result<AddOutcome, SwitchError> {
    validate_name(name).map_err(StoreError::InvalidName)?;

    let folder = workspace.overlay_dir(name);
    if folder.exists() {
        warn!("variation \"{name}\" exists, skipping..");
        return Ok(AddOutcome::Skipped);
    }

    create_dir(&workspace.android_overlay(name))?;
    create_dir(&workspace.target_overlay(name))?;
    create_dir(&workspace.source_overlay(name))?;

    let outcome = ensure_profile(&workspace.registry_path(), name)?;
    info!(folder = %folder.display(), "Created variation \"{name}\"");
    Ok(AddOutcome::Created(outcome))
}

/// Add each variation in turn. Existing ones are skipped; the first hard
/// error stops the batch.
pub fn add_variations<S: AsRef<str>>(
    workspace: &Workspace,
    names: &[S],
) -> Result<Vec<AddOutcome>, SwitchError> {
    names
        .iter()
        .map(|name| add_variation(workspace, name.as_ref()))
        .collect()
}
