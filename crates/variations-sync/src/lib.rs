//! Overlay a directory tree onto another one.
//!
//! Files are merged into the destination: nothing that exists only on the
//! destination side is ever removed, so files left behind by an earlier
//! overlay stay in place unless a new file with the same relative path
//! replaces them.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("source directory {0} does not exist")]
    SourceMissing(PathBuf),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("failed to create dir {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to copy {from} -> {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

/// Options for a synchronization run.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Replace destination files that share a relative path with a source file.
    pub overwrite: bool,
    /// Skip every source entry whose `/`-separated relative path matches.
    /// A skipped directory is skipped with all of its contents.
    pub exclude: Option<Regex>,
}

impl SyncOptions {
    pub fn overwrite() -> Self {
        SyncOptions {
            overwrite: true,
            exclude: None,
        }
    }

    pub fn excluding(mut self, pattern: Regex) -> Self {
        self.exclude = Some(pattern);
        self
    }

    fn is_excluded(&self, relative: &str) -> bool {
        self.exclude
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(relative))
    }
}

/// What a synchronization run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub copied: usize,
    pub skipped: usize,
    pub excluded: usize,
}

fn relative_string(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn create_dir(path: &Path) -> Result<(), SyncError> {
    fs::create_dir_all(path).map_err(|source| SyncError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

fn copy_file(src: &Path, dst: &Path) -> Result<(), SyncError> {
    let copy_err = |source| SyncError::Copy {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source,
    };

    // Never write through a symlink left at the destination.
    if dst.is_symlink() {
        fs::remove_file(dst).map_err(copy_err)?;
    }
    fs::copy(src, dst).map_err(copy_err)?;

    // Make writable so a later overlay can replace it.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = fs::metadata(dst) {
            let mut perms = metadata.permissions();
            let mode = perms.mode() | 0o200;
            perms.set_mode(mode);
            let _ = fs::set_permissions(dst, perms);
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<(), SyncError> {
    let copy_err = |source| SyncError::Copy {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source,
    };

    let link_target = fs::read_link(src).map_err(copy_err)?;
    if dst.symlink_metadata().is_ok() {
        fs::remove_file(dst).map_err(copy_err)?;
    }
    std::os::unix::fs::symlink(&link_target, dst).map_err(copy_err)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> Result<(), SyncError> {
    copy_file(src, dst)
}

/// Recursively copy `source` into `destination`.
///
/// Missing destination directories are created. An existing destination
/// file is replaced only when `options.overwrite` is set; otherwise it is
/// left alone and counted as skipped.
pub fn sync(
    source: &Path,
    destination: &Path,
    options: &SyncOptions,
) -> Result<SyncReport, SyncError> {
    if !source.is_dir() {
        return Err(SyncError::SourceMissing(source.to_path_buf()));
    }

    create_dir(destination)?;

    let mut report = SyncReport::default();
    let mut walker = WalkDir::new(source)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let relative_str = relative_string(relative);

        if options.is_excluded(&relative_str) {
            debug!(path = %relative_str, "excluded");
            report.excluded += 1;
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }

        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            create_dir(&target)?;
            continue;
        }

        if target.symlink_metadata().is_ok() && !options.overwrite {
            debug!(path = %relative_str, "exists, not overwriting");
            report.skipped += 1;
            continue;
        }

        if entry.file_type().is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            copy_file(entry.path(), &target)?;
        }
        debug!(path = %relative_str, "copied");
        report.copied += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn write_tree(root: &Path, files: &[(&str, &str)]) {
        for (path, contents) in files {
            let path = root.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
    }

    fn read_tree(root: &Path) -> BTreeMap<String, String> {
        WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .map(|e| e.unwrap())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let rel = relative_string(e.path().strip_prefix(root).unwrap());
                (rel, fs::read_to_string(e.path()).unwrap())
            })
            .collect()
    }

    fn tree(files: &[(&str, &str)]) -> BTreeMap<String, String> {
        files
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_overlay_not_mirror() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write_tree(src.path(), &[("a", "1"), ("b", "2")]);
        write_tree(dst.path(), &[("a", "0"), ("c", "3")]);

        let report = sync(src.path(), dst.path(), &SyncOptions::overwrite()).unwrap();

        assert_eq!(report.copied, 2);
        assert_eq!(
            read_tree(dst.path()),
            tree(&[("a", "1"), ("b", "2"), ("c", "3")])
        );
    }

    #[test]
    fn test_no_overwrite_keeps_existing() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write_tree(src.path(), &[("a", "1"), ("b", "2")]);
        write_tree(dst.path(), &[("a", "0")]);

        let report = sync(src.path(), dst.path(), &SyncOptions::default()).unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(read_tree(dst.path()), tree(&[("a", "0"), ("b", "2")]));
    }

    #[test]
    fn test_nested_dirs_are_created() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write_tree(src.path(), &[("res/values/strings.xml", "<x/>")]);
        fs::create_dir_all(src.path().join("empty/dir")).unwrap();
        let out = dst.path().join("not-yet");

        sync(src.path(), &out, &SyncOptions::overwrite()).unwrap();

        assert_eq!(read_tree(&out), tree(&[("res/values/strings.xml", "<x/>")]));
        assert!(out.join("empty/dir").is_dir());
    }

    #[test]
    fn test_exclude_prunes_prefix() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write_tree(
            src.path(),
            &[
                ("main_target/Info.plist", "x"),
                ("main_target/Images.xcassets/a.png", "y"),
                ("Podfile", "pods"),
                ("Shared/main_target_notes.txt", "keep"),
            ],
        );

        let options = SyncOptions::overwrite().excluding(Regex::new("^main_target(/|$)").unwrap());
        let report = sync(src.path(), dst.path(), &options).unwrap();

        assert_eq!(report.excluded, 1);
        assert!(!dst.path().join("main_target").exists());
        assert_eq!(
            read_tree(dst.path()),
            tree(&[("Podfile", "pods"), ("Shared/main_target_notes.txt", "keep")])
        );
    }

    #[test]
    fn test_exclude_leaves_previous_copies() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write_tree(src.path(), &[("skip.txt", "new")]);
        write_tree(dst.path(), &[("skip.txt", "old")]);

        let options = SyncOptions::overwrite().excluding(Regex::new("skip").unwrap());
        sync(src.path(), dst.path(), &options).unwrap();

        assert_eq!(read_tree(dst.path()), tree(&[("skip.txt", "old")]));
    }

    #[test]
    fn test_missing_source() {
        let dst = tempfile::tempdir().unwrap();
        let missing = dst.path().join("nope");
        let err = sync(&missing, dst.path(), &SyncOptions::overwrite()).unwrap_err();
        assert!(matches!(err, SyncError::SourceMissing(p) if p == missing));
    }

    #[test]
    fn test_sync_is_idempotent() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write_tree(src.path(), &[("a/b/c.txt", "c"), ("d.txt", "d")]);

        sync(src.path(), dst.path(), &SyncOptions::overwrite()).unwrap();
        let first = read_tree(dst.path());
        sync(src.path(), dst.path(), &SyncOptions::overwrite()).unwrap();
        assert_eq!(read_tree(dst.path()), first);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_recreated() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write_tree(src.path(), &[("real.txt", "r")]);
        std::os::unix::fs::symlink("real.txt", src.path().join("link.txt")).unwrap();

        sync(src.path(), dst.path(), &SyncOptions::overwrite()).unwrap();

        let link = dst.path().join("link.txt");
        assert!(link.is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("real.txt"));
        assert_eq!(fs::read_to_string(link).unwrap(), "r");
    }
}
