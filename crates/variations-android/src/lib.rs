//! Android side of a variation switch: the external rename and clean steps,
//! and the signing selector in `app/build.gradle`.

mod signing;
mod tooling;

pub use signing::{patch_signing_config, SigningPatch};
pub use tooling::{AndroidTooling, CommandTooling, ToolOutput};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: PathBuf,
        source: std::io::Error,
    },
    #[error("android rename failed (exit status {status:?}): {stderr}")]
    RenameFailed { status: Option<i32>, stderr: String },
    #[error("could not clean android project (exit status {status:?}): {stderr}")]
    CleanFailed { status: Option<i32>, stderr: String },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
