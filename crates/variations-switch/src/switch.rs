//! Applying a variation to the live workspace.
//!
//! A switch is a fixed, ordered list of [`Step`]s. Each step reads the
//! current state of the files it owns and writes the state the profile asks
//! for, so running the same switch again converges instead of compounding.
//! The first failing step aborts the run; completed steps are not undone.

use regex::Regex;
use std::path::PathBuf;
use tracing::{debug, info};
use variations_android::{patch_signing_config, AndroidTooling, SigningPatch};
use variations_pbxproj::{PbxProject, Target};
use variations_plist::PropertyList;
use variations_store::{StoreError, VariationProfile};
use variations_sync::{sync, SyncOptions, SyncReport};

use crate::discovery::{find_project_file, find_target_dir, Discovery};
use crate::{SwitchError, Workspace};

pub const BUNDLE_IDENTIFIER_SETTING: &str = "PRODUCT_BUNDLE_IDENTIFIER";
pub const DEVELOPMENT_TEAM_SETTING: &str = "DEVELOPMENT_TEAM";
pub const INFO_PLIST: &str = "Info.plist";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    IosProject,
    IosManifest,
    IosOverlay,
    AndroidOverlay,
    AndroidRename,
    AndroidSigning,
    SourceOverlay,
}

impl Step {
    pub const ALL: [Step; 7] = [
        Step::IosProject,
        Step::IosManifest,
        Step::IosOverlay,
        Step::AndroidOverlay,
        Step::AndroidRename,
        Step::AndroidSigning,
        Step::SourceOverlay,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            Step::IosProject => "updating Xcode project build settings",
            Step::IosManifest => "updating iOS display name",
            Step::IosOverlay => "copying iOS files",
            Step::AndroidOverlay => "copying Android files",
            Step::AndroidRename => "renaming Android app",
            Step::AndroidSigning => "updating Android signing config",
            Step::SourceOverlay => "copying shared source files",
        }
    }
}

/// What a completed switch changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchReport {
    pub variation: String,
    pub project: PathBuf,
    pub target: String,
    /// Build configurations of the target that received the new settings.
    pub configurations: usize,
    pub ios: SyncReport,
    pub ios_target: SyncReport,
    pub android: SyncReport,
    pub source: SyncReport,
    pub signing: Option<SigningPatch>,
}

struct Run<'a> {
    workspace: &'a Workspace,
    tooling: &'a dyn AndroidTooling,
    profile: &'a VariationProfile,
    found: Option<(PbxProject, Target)>,
    report: SwitchReport,
}

impl Run<'_> {
    /// The parsed project and its first target, discovered and read once.
    fn discover(&mut self) -> Result<(&mut PbxProject, &Target), SwitchError> {
        let found = match self.found.take() {
            Some(found) => found,
            None => self.open_project()?,
        };
        let (project, target) = self.found.insert(found);
        Ok((project, &*target))
    }

    fn open_project(&mut self) -> Result<(PbxProject, Target), SwitchError> {
        let ios_root = self.workspace.ios_root();
        let path = match find_project_file(&ios_root)? {
            Discovery::Found(path) => path,
            Discovery::NotFound => return Err(SwitchError::NoProject(ios_root)),
            Discovery::Ambiguous(candidates) => {
                return Err(SwitchError::AmbiguousProject(candidates))
            }
        };
        let project = PbxProject::open(&path)?;
        let target = project
            .first_target()
            .ok_or_else(|| SwitchError::NoTarget(path.clone()))?;
        debug!(project = %path.display(), target = %target.name, "found first target");

        self.report.project = path;
        self.report.target = target.name.clone();
        Ok((project, target))
    }

    fn target_dir(&mut self) -> Result<PathBuf, SwitchError> {
        let name = self.discover()?.1.name.clone();
        let ios_root = self.workspace.ios_root();
        match find_target_dir(&ios_root, &name)? {
            Discovery::Found(dir) => Ok(dir),
            Discovery::NotFound | Discovery::Ambiguous(_) => {
                Err(SwitchError::NoTargetDir(ios_root.join(&name)))
            }
        }
    }

    fn run(&mut self, step: Step) -> Result<(), SwitchError> {
        info!("{}..", step.description());
        let (workspace, profile) = (self.workspace, self.profile);
        let name = profile.name.as_str();

        match step {
            Step::IosProject => {
                let ios = &profile.ios;
                let (project, target) = self.discover()?;
                let configurations = project.set_target_build_property(
                    &target.id,
                    BUNDLE_IDENTIFIER_SETTING,
                    &ios.bundle_id,
                )?;
                project.set_target_build_property(
                    &target.id,
                    DEVELOPMENT_TEAM_SETTING,
                    &ios.xcode_team,
                )?;
                project.save()?;
                self.report.configurations = configurations;
            }
            Step::IosManifest => {
                let path = self.target_dir()?.join(INFO_PLIST);
                let manifest_err = |source| SwitchError::Manifest {
                    path: path.clone(),
                    source,
                };
                let mut manifest = PropertyList::open(&path).map_err(manifest_err)?;
                manifest.set_display_name(&profile.ios.display_name);
                manifest.save().map_err(manifest_err)?;
                debug!(format = manifest.format.name(), "saved manifest");
            }
            Step::IosOverlay => {
                let exclude = target_overlay_pattern(&workspace.layout.target_overlay_dir)?;
                self.report.ios = sync(
                    &workspace.ios_overlay(name),
                    &workspace.ios_root(),
                    &SyncOptions::overwrite().excluding(exclude),
                )?;

                let target_dir = self.target_dir()?;
                self.report.ios_target = sync(
                    &workspace.target_overlay(name),
                    &target_dir,
                    &SyncOptions::overwrite(),
                )?;
            }
            Step::AndroidOverlay => {
                self.report.android = sync(
                    &workspace.android_overlay(name),
                    &workspace.android_root(),
                    &SyncOptions::overwrite(),
                )?;
            }
            Step::AndroidRename => {
                let android = &profile.android;
                self.tooling
                    .rename(&android.display_name, &android.bundle_id)?;
                self.tooling.clean()?;
            }
            Step::AndroidSigning => {
                let patch = patch_signing_config(&workspace.build_script(), name)?;
                self.report.signing = Some(patch);
            }
            Step::SourceOverlay => {
                self.report.source = sync(
                    &workspace.source_overlay(name),
                    &workspace.source_root(),
                    &SyncOptions::overwrite(),
                )?;
            }
        }
        Ok(())
    }
}

/// Matches the target subfolder of an iOS overlay and everything below it.
fn target_overlay_pattern(subfolder: &str) -> Result<Regex, SwitchError> {
    Regex::new(&format!("^{}(/|$)", regex::escape(subfolder))).map_err(|e| {
        SwitchError::Config {
            path: PathBuf::from(subfolder),
            message: e.to_string(),
        }
    })
}

/// Make the workspace match the profile registered as `name`.
pub fn switch_to(
    workspace: &Workspace,
    tooling: &dyn AndroidTooling,
    name: &str,
) -> Result<SwitchReport, SwitchError> {
    let profiles = variations_store::load(&workspace.registry_path())?;
    let profile = variations_store::lookup(&profiles, name)?;

    let pretty = serde_json::to_string_pretty(profile).map_err(StoreError::from)?;
    info!("Switching to \"{name}\" with:\n{pretty}");

    let mut run = Run {
        workspace,
        tooling,
        profile,
        found: None,
        report: SwitchReport {
            variation: name.to_string(),
            ..SwitchReport::default()
        },
    };
    for step in Step::ALL {
        run.run(step)?;
    }

    info!("Done.");
    Ok(run.report)
}
