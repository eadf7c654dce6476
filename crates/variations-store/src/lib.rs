//! The variation registry: a pretty-printed JSON array of profiles on disk.
//!
//! The file is the only source of truth and every operation reads it fresh.
//! Appending splices the new entry into the existing text, so entries already
//! on disk keep their exact bytes.

mod profile;

pub use profile::{validate_name, AndroidProfile, IosProfile, VariationProfile};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("could not find {0}")]
    Missing(PathBuf),
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not encode registry: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("variation \"{0}\" does not exist")]
    NotFound(String),
    #[error("variation \"{0}\" already exists")]
    DuplicateName(String),
    #[error("{0}")]
    InvalidName(String),
}

/// What [`ensure_profile`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The registry file did not exist and was created with the profile.
    Created,
    /// The profile was appended to an existing registry.
    Appended,
    /// A profile with that name was already registered; nothing was written.
    AlreadyPresent,
}

/// Load every profile from the registry file.
pub fn load(path: &Path) -> Result<Vec<VariationProfile>, StoreError> {
    let data = fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            StoreError::Missing(path.to_path_buf())
        } else {
            StoreError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    serde_json::from_slice(&data).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Find the profile called `name`. The first match wins if the file holds duplicates.
pub fn lookup<'a>(
    profiles: &'a [VariationProfile],
    name: &str,
) -> Result<&'a VariationProfile, StoreError> {
    profiles
        .iter()
        .find(|profile| profile.name == name)
        .ok_or_else(|| StoreError::NotFound(name.to_string()))
}

/// Write the whole registry, pretty-printed with two-space indentation.
pub fn save(path: &Path, profiles: &[VariationProfile]) -> Result<(), StoreError> {
    let mut data = serde_json::to_vec_pretty(profiles)?;
    data.push(b'\n');
    write(path, &data)
}

fn write(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, data).map_err(write_err)
}

/// Append a profile after the existing entries.
/// A missing registry file is treated as an empty one.
///
/// Existing entries are not re-encoded: the new entry is inserted before the
/// closing `]` of the text on disk.
pub fn append(path: &Path, profile: VariationProfile) -> Result<(), StoreError> {
    validate_name(&profile.name).map_err(StoreError::InvalidName)?;

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return save(path, &[profile]),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let mut profiles: Vec<VariationProfile> =
        serde_json::from_str(&text).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    if profiles.iter().any(|p| p.name == profile.name) {
        return Err(StoreError::DuplicateName(profile.name));
    }

    match splice_entry(&text, &profile, profiles.is_empty())? {
        Some(spliced) => write(path, spliced.as_bytes()),
        None => {
            profiles.push(profile);
            save(path, &profiles)
        }
    }
}

/// Insert `profile` as the last element of the JSON array in `text`, indented
/// the way [`save`] indents. `None` if the text does not end with `]`.
fn splice_entry(
    text: &str,
    profile: &VariationProfile,
    empty: bool,
) -> Result<Option<String>, StoreError> {
    let Some(body) = text.trim_end().strip_suffix(']') else {
        return Ok(None);
    };
    let entry = serde_json::to_string_pretty(profile)?
        .lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n");
    let separator = if empty { "\n" } else { ",\n" };
    Ok(Some(format!("{}{separator}{entry}\n]\n", body.trim_end())))
}

/// Make sure a profile called `name` is registered, adding a default one if not.
pub fn ensure_profile(path: &Path, name: &str) -> Result<EnsureOutcome, StoreError> {
    let profile = VariationProfile::with_defaults(name);

    if !path.exists() {
        validate_name(name).map_err(StoreError::InvalidName)?;
        save(path, &[profile])?;
        info!(path = %path.display(), "created registry");
        return Ok(EnsureOutcome::Created);
    }

    match append(path, profile) {
        Ok(()) => Ok(EnsureOutcome::Appended),
        Err(StoreError::DuplicateName(name)) => {
            warn!(
                "variation \"{name}\" already exists in {} but it had no folder. folder was recreated with default contents.",
                path.display()
            );
            Ok(EnsureOutcome::AlreadyPresent)
        }
        Err(e) => Err(e),
    }
}
