//! Switching a white-label app workspace between variations, and creating
//! new variation skeletons.

mod add;
pub mod discovery;
mod error;
mod layout;
mod switch;

pub use add::{add_variation, add_variations, AddOutcome};
pub use error::SwitchError;
pub use layout::{Layout, Workspace, CONFIGURATION_FILE, CONFIGURATION_PATH_ENV};
pub use switch::{
    switch_to, Step, SwitchReport, BUNDLE_IDENTIFIER_SETTING, DEVELOPMENT_TEAM_SETTING,
    INFO_PLIST,
};

pub use variations_android::{AndroidTooling, CommandTooling};
pub use variations_store::EnsureOutcome;
