//! Locating the live Xcode project and target directory by naming convention.

use std::fs;
use std::path::{Path, PathBuf};

use crate::SwitchError;

/// Outcome of looking for a uniquely named filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    Found(PathBuf),
    NotFound,
    Ambiguous(Vec<PathBuf>),
}

impl Discovery {
    fn from_candidates(mut candidates: Vec<PathBuf>) -> Discovery {
        candidates.sort();
        match candidates.len() {
            0 => Discovery::NotFound,
            1 => Discovery::Found(candidates.remove(0)),
            _ => Discovery::Ambiguous(candidates),
        }
    }
}

fn entries_matching(
    dir: &Path,
    want_dir: bool,
    matches: impl Fn(&str) -> bool,
) -> Result<Vec<PathBuf>, SwitchError> {
    let io_err = |source| SwitchError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_err(e)),
    };

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        if path.is_dir() != want_dir {
            continue;
        }
        if entry.file_name().to_str().is_some_and(&matches) {
            found.push(path);
        }
    }
    Ok(found)
}

/// Find the `project.pbxproj` of the single `*.xcodeproj` directory in `ios_root`.
pub fn find_project_file(ios_root: &Path) -> Result<Discovery, SwitchError> {
    let projects = entries_matching(ios_root, true, |name| name.ends_with(".xcodeproj"))?;
    let project_dir = match Discovery::from_candidates(projects) {
        Discovery::Found(dir) => dir,
        other => return Ok(other),
    };

    let files = entries_matching(&project_dir, false, |name| name.ends_with(".pbxproj"))?;
    let standard = project_dir.join("project.pbxproj");
    if files.contains(&standard) {
        return Ok(Discovery::Found(standard));
    }
    Ok(Discovery::from_candidates(files))
}

/// Find the directory of the target called `target_name` in `ios_root`.
pub fn find_target_dir(ios_root: &Path, target_name: &str) -> Result<Discovery, SwitchError> {
    let dirs = entries_matching(ios_root, true, |name| name == target_name)?;
    Ok(Discovery::from_candidates(dirs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_project() {
        let dir = tempfile::tempdir().unwrap();
        let proj = dir.path().join("Acme.xcodeproj");
        fs::create_dir_all(proj.join("xcshareddata")).unwrap();
        fs::write(proj.join("project.pbxproj"), "{}").unwrap();
        fs::create_dir(dir.path().join("Pods")).unwrap();
        fs::write(dir.path().join("Podfile"), "").unwrap();

        assert_eq!(
            find_project_file(dir.path()).unwrap(),
            Discovery::Found(proj.join("project.pbxproj"))
        );
    }

    #[test]
    fn test_workspace_is_not_a_project() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("Acme.xcworkspace")).unwrap();
        assert_eq!(find_project_file(dir.path()).unwrap(), Discovery::NotFound);
        assert_eq!(
            find_project_file(&dir.path().join("missing")).unwrap(),
            Discovery::NotFound
        );
    }

    #[test]
    fn test_project_without_pbxproj() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("Acme.xcodeproj")).unwrap();
        assert_eq!(find_project_file(dir.path()).unwrap(), Discovery::NotFound);
    }

    #[test]
    fn test_two_projects_are_ambiguous() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["B.xcodeproj", "A.xcodeproj"] {
            let proj = dir.path().join(name);
            fs::create_dir(&proj).unwrap();
            fs::write(proj.join("project.pbxproj"), "{}").unwrap();
        }
        assert_eq!(
            find_project_file(dir.path()).unwrap(),
            Discovery::Ambiguous(vec![
                dir.path().join("A.xcodeproj"),
                dir.path().join("B.xcodeproj"),
            ])
        );
    }

    #[test]
    fn test_target_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("Acme")).unwrap();
        fs::write(dir.path().join("AcmeTests"), "not a dir").unwrap();

        assert_eq!(
            find_target_dir(dir.path(), "Acme").unwrap(),
            Discovery::Found(dir.path().join("Acme"))
        );
        assert_eq!(
            find_target_dir(dir.path(), "AcmeTests").unwrap(),
            Discovery::NotFound
        );
    }
}
