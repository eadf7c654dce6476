use regex::{Captures, Regex};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::ToolError;

/// `signingConfig signingConfigs.<name>` lines, with whatever indentation they carry.
static SIGNING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([ \t]*)signingConfig signingConfigs\.[^\r\n]*")
        .expect("Invalid signing config regex")
});

/// Result of patching the build script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningPatch {
    /// This many selector lines now name the variation.
    Patched(usize),
    /// The build script has no selector line.
    NoMatch,
    /// The build script does not exist.
    MissingFile,
}

/// Point every signing selector line of `build_script` at `signingConfigs.<variation>`.
///
/// Finding nothing to patch is not an error; it is logged and reported.
pub fn patch_signing_config(build_script: &Path, variation: &str) -> Result<SigningPatch, ToolError> {
    let text = match fs::read_to_string(build_script) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                "could not change android signing config: {} not found",
                build_script.display()
            );
            return Ok(SigningPatch::MissingFile);
        }
        Err(source) => {
            return Err(ToolError::Io {
                path: build_script.to_path_buf(),
                source,
            })
        }
    };

    let count = SIGNING_LINE.find_iter(&text).count();
    if count == 0 {
        warn!(
            "could not change android signing config: no signingConfig line in {}",
            build_script.display()
        );
        return Ok(SigningPatch::NoMatch);
    }

    let patched = SIGNING_LINE.replace_all(&text, |caps: &Captures| {
        format!("{}signingConfig signingConfigs.{variation}", &caps[1])
    });

    if patched != text {
        fs::write(build_script, patched.as_bytes()).map_err(|source| ToolError::Io {
            path: build_script.to_path_buf(),
            source,
        })?;
    }
    debug!(lines = count, variation, "patched signing config");
    Ok(SigningPatch::Patched(count))
}
