use std::path::PathBuf;
use thiserror::Error;
use variations_android::ToolError;
use variations_pbxproj::PbxError;
use variations_plist::PlistError;
use variations_store::StoreError;
use variations_sync::SyncError;

#[derive(Error, Debug)]
pub enum SwitchError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no .xcodeproj found in {0}")]
    NoProject(PathBuf),
    #[error("more than one Xcode project found: {}", display_paths(.0))]
    AmbiguousProject(Vec<PathBuf>),
    #[error("could not determine the iOS project's main target in {0}")]
    NoTarget(PathBuf),
    #[error("target directory {0} does not exist")]
    NoTargetDir(PathBuf),
    #[error("could not update Xcode project: {0}")]
    Project(#[from] PbxError),
    #[error("could not update {path}: {source}")]
    Manifest { path: PathBuf, source: PlistError },
    #[error("error copying files: {0}")]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("invalid configuration {path}: {message}")]
    Config { path: PathBuf, message: String },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
