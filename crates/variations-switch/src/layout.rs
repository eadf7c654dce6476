use std::path::{Path, PathBuf};
use tracing::debug;
use variations_android::CommandTooling;
use variations_plist::PropertyList;

use crate::SwitchError;

/// Environment variable naming an explicit configuration file.
pub const CONFIGURATION_PATH_ENV: &str = "VARIATIONS_CONFIGURATION_PATH";

/// Default configuration file name, looked up in the workspace root.
pub const CONFIGURATION_FILE: &str = "variations.plist";

/// Where things live in a workspace. All paths are relative to the workspace root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Directory holding the registry and one overlay folder per variation.
    pub overlay_root: PathBuf,
    /// Registry file name inside `overlay_root`.
    pub registry_file: String,
    pub ios_root: PathBuf,
    pub android_root: PathBuf,
    pub source_root: PathBuf,
    /// Subfolder of an iOS overlay that is copied into the target directory.
    pub target_overlay_dir: String,
    pub build_script: PathBuf,
    pub rename_tool: PathBuf,
    /// Gradle wrapper, relative to `android_root`.
    pub gradle: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            overlay_root: PathBuf::from("variations"),
            registry_file: "apps.json".to_string(),
            ios_root: PathBuf::from("ios"),
            android_root: PathBuf::from("android"),
            source_root: PathBuf::from("src"),
            target_overlay_dir: "main_target".to_string(),
            build_script: PathBuf::from("android/app/build.gradle"),
            rename_tool: PathBuf::from("node_modules/react-native-rename/lib/index.js"),
            gradle: PathBuf::from("./gradlew"),
        }
    }
}

impl Layout {
    /// Configuration file search paths.
    pub fn default_paths(root: &Path) -> Vec<PathBuf> {
        match std::env::var_os(CONFIGURATION_PATH_ENV) {
            Some(path) => vec![PathBuf::from(path)],
            None => vec![root.join(CONFIGURATION_FILE)],
        }
    }

    /// Load the layout from the first configuration file that exists,
    /// falling back to the defaults when there is none.
    pub fn load(paths: &[PathBuf]) -> Result<Layout, SwitchError> {
        let mut layout = Layout::default();
        let Some(path) = paths.iter().find(|p| p.is_file()) else {
            return Ok(layout);
        };

        debug!(path = %path.display(), "loading configuration");
        let config = PropertyList::open(path).map_err(|e| SwitchError::Config {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let key = |name: &str| config_string(&config, path, name);
        if let Some(v) = key("OverlayRoot")? {
            layout.overlay_root = v.into();
        }
        if let Some(v) = key("RegistryFile")? {
            layout.registry_file = v;
        }
        if let Some(v) = key("IosRoot")? {
            layout.ios_root = v.into();
        }
        if let Some(v) = key("AndroidRoot")? {
            layout.android_root = v.into();
        }
        if let Some(v) = key("SourceRoot")? {
            layout.source_root = v.into();
        }
        if let Some(v) = key("TargetOverlayDirectory")? {
            layout.target_overlay_dir = v;
        }
        if let Some(v) = key("BuildScript")? {
            layout.build_script = v.into();
        }
        if let Some(v) = key("RenameTool")? {
            layout.rename_tool = v.into();
        }
        if let Some(v) = key("GradleWrapper")? {
            layout.gradle = v.into();
        }

        Ok(layout)
    }
}

fn config_string(
    config: &PropertyList,
    path: &Path,
    key: &str,
) -> Result<Option<String>, SwitchError> {
    match config.get(key) {
        None => Ok(None),
        Some(value) => match value.as_string() {
            Some(s) if !s.is_empty() => Ok(Some(s.to_string())),
            _ => Err(SwitchError::Config {
                path: path.to_path_buf(),
                message: format!("{key} must be a non-empty string"),
            }),
        },
    }
}

/// A project checkout plus its layout.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub layout: Layout,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, layout: Layout) -> Self {
        Workspace {
            root: root.into(),
            layout,
        }
    }

    /// Open a workspace, reading its configuration file if there is one.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, SwitchError> {
        let root = root.into();
        let layout = Layout::load(&Layout::default_paths(&root))?;
        Ok(Workspace { root, layout })
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root
            .join(&self.layout.overlay_root)
            .join(&self.layout.registry_file)
    }

    pub fn overlay_dir(&self, variation: &str) -> PathBuf {
        self.root.join(&self.layout.overlay_root).join(variation)
    }

    pub fn ios_overlay(&self, variation: &str) -> PathBuf {
        self.overlay_dir(variation).join("ios")
    }

    pub fn target_overlay(&self, variation: &str) -> PathBuf {
        self.ios_overlay(variation)
            .join(&self.layout.target_overlay_dir)
    }

    pub fn android_overlay(&self, variation: &str) -> PathBuf {
        self.overlay_dir(variation).join("android")
    }

    pub fn source_overlay(&self, variation: &str) -> PathBuf {
        self.overlay_dir(variation).join("src")
    }

    pub fn ios_root(&self) -> PathBuf {
        self.root.join(&self.layout.ios_root)
    }

    pub fn android_root(&self) -> PathBuf {
        self.root.join(&self.layout.android_root)
    }

    pub fn source_root(&self) -> PathBuf {
        self.root.join(&self.layout.source_root)
    }

    pub fn build_script(&self) -> PathBuf {
        self.root.join(&self.layout.build_script)
    }

    /// Subprocess-backed Android tooling for this workspace.
    pub fn command_tooling(&self) -> CommandTooling {
        CommandTooling {
            workspace: self.root.clone(),
            android_dir: self.android_root(),
            rename_tool: self.layout.rename_tool.clone(),
            gradle: self.layout.gradle.clone(),
        }
    }
}
