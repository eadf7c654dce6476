use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output};
use tracing::{debug, info};

use crate::ToolError;

/// Captured output of an external tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for ToolOutput {
    fn from(output: Output) -> Self {
        ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// The two external steps of the Android side of a switch.
pub trait AndroidTooling {
    /// Rewrite the Android manifest, resources and package layout for a new
    /// display name and application id.
    fn rename(&self, display_name: &str, bundle_id: &str) -> Result<ToolOutput, ToolError>;

    /// Clean the Android build tree.
    fn clean(&self) -> Result<ToolOutput, ToolError>;
}

/// Runs the real rename tool and the Gradle wrapper as subprocesses.
#[derive(Debug, Clone)]
pub struct CommandTooling {
    /// Directory the rename tool runs in (the workspace root).
    pub workspace: PathBuf,
    /// Android project directory; the clean step runs there.
    pub android_dir: PathBuf,
    pub rename_tool: PathBuf,
    pub gradle: PathBuf,
}

/// A program given as a path (`./gradlew`, `node_modules/x/index.js`) is
/// resolved against `base`; a bare name is looked up on `PATH`.
fn resolve_program(base: &Path, program: &Path) -> PathBuf {
    if program.is_absolute() || program.components().count() == 1 {
        program.to_path_buf()
    } else {
        base.join(program)
    }
}

fn run(mut command: Command, program: &Path) -> Result<(ExitStatus, ToolOutput), ToolError> {
    debug!(?command, "running");
    let output = command.output().map_err(|source| ToolError::Launch {
        program: program.to_path_buf(),
        source,
    })?;
    let status = output.status;
    let output = ToolOutput::from(output);
    if !output.stdout.is_empty() {
        debug!(stdout = %output.stdout.trim_end(), "tool output");
    }
    Ok((status, output))
}

impl AndroidTooling for CommandTooling {
    fn rename(&self, display_name: &str, bundle_id: &str) -> Result<ToolOutput, ToolError> {
        let program = resolve_program(&self.workspace, &self.rename_tool);
        info!(display_name, bundle_id, "renaming android app");

        let mut command = Command::new(&program);
        command
            .arg(display_name)
            .arg("-b")
            .arg(bundle_id)
            .current_dir(&self.workspace);

        let (status, output) = run(command, &program)?;
        if status.success() {
            Ok(output)
        } else {
            Err(ToolError::RenameFailed {
                status: status.code(),
                stderr: output.stderr,
            })
        }
    }

    fn clean(&self) -> Result<ToolOutput, ToolError> {
        let program = resolve_program(&self.android_dir, &self.gradle);
        info!(dir = %self.android_dir.display(), "cleaning android project");

        let mut command = Command::new(&program);
        command.arg("clean").current_dir(&self.android_dir);

        let (status, output) = run(command, &program)?;
        if status.success() {
            Ok(output)
        } else {
            Err(ToolError::CleanFailed {
                status: status.code(),
                stderr: output.stderr,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tooling(dir: &Path, rename_tool: &str, gradle: &str) -> CommandTooling {
        CommandTooling {
            workspace: dir.to_path_buf(),
            android_dir: dir.to_path_buf(),
            rename_tool: PathBuf::from(rename_tool),
            gradle: PathBuf::from(gradle),
        }
    }

    #[test]
    fn test_resolve_program() {
        let base = Path::new("/work");
        assert_eq!(
            resolve_program(base, Path::new("./gradlew")),
            PathBuf::from("/work/./gradlew")
        );
        assert_eq!(
            resolve_program(base, Path::new("node_modules/react-native-rename/lib/index.js")),
            PathBuf::from("/work/node_modules/react-native-rename/lib/index.js")
        );
        assert_eq!(resolve_program(base, Path::new("gradle")), PathBuf::from("gradle"));
        assert_eq!(
            resolve_program(base, Path::new("/usr/bin/gradle")),
            PathBuf::from("/usr/bin/gradle")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_rename_passes_name_and_id() {
        let dir = tempfile::tempdir().unwrap();
        let output = tooling(dir.path(), "echo", "true")
            .rename("Acme App", "com.acme.app")
            .unwrap();
        assert_eq!(output.stdout, "Acme App -b com.acme.app\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_failures_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tooling(dir.path(), "false", "false");
        assert!(matches!(
            tools.rename("A", "com.a"),
            Err(ToolError::RenameFailed { status: Some(1), .. })
        ));
        assert!(matches!(tools.clean(), Err(ToolError::CleanFailed { .. })));
        assert!(tooling(dir.path(), "true", "true").clean().is_ok());
    }

    #[test]
    fn test_missing_tool() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tooling(dir.path(), "./no-such-tool", "./gradlew");
        assert!(matches!(
            tools.rename("A", "com.a"),
            Err(ToolError::Launch { .. })
        ));
        assert!(matches!(tools.clean(), Err(ToolError::Launch { .. })));
    }
}
