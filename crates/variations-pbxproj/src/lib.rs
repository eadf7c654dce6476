use plist::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use variations_plist::{PlistError, PlistFormat};

mod edit;

#[derive(Error, Debug)]
pub enum PbxError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse project: {0}")]
    Parse(#[from] PlistError),
    #[error("project is missing the {0} entry")]
    Malformed(&'static str),
    #[error("object {0} is missing or not a dictionary")]
    MissingObject(String),
    #[error("project has no targets")]
    NoTarget,
}

/// A target entry of the project graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: String,
    pub name: String,
}

/// A parsed .pbxproj file.
///
/// An ASCII project also keeps its source text. Edits are spliced into that
/// text, so comments, section markers and layout survive a save and an
/// unmodified project writes back byte for byte.
#[derive(Debug, Clone)]
pub struct PbxProject {
    pub path: PathBuf,
    pub root_object_id: String,
    format: PlistFormat,
    text: Option<String>,
    document: plist::Dictionary,
}

impl PbxProject {
    /// Open a .xcodeproj directory or a .pbxproj file.
    pub fn open(path: impl AsRef<Path>) -> Result<PbxProject, PbxError> {
        let path = path.as_ref();
        let pbxproj_path = if path.extension().is_some_and(|ext| ext == "pbxproj") {
            path.to_path_buf()
        } else {
            path.join("project.pbxproj")
        };

        let data = fs::read(&pbxproj_path).map_err(|source| PbxError::Read {
            path: pbxproj_path.clone(),
            source,
        })?;
        let mut project = PbxProject::parse(&data)?;
        project.path = pbxproj_path;
        Ok(project)
    }

    pub fn parse(data: &[u8]) -> Result<PbxProject, PbxError> {
        let (value, format) = variations_plist::deserialize(data)?;
        let document = value
            .into_dictionary()
            .ok_or(PbxError::Malformed("top-level dictionary"))?;

        let root_object_id = match document.get("rootObject") {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(PbxError::Malformed("rootObject")),
        };
        if !matches!(document.get("objects"), Some(Value::Dictionary(_))) {
            return Err(PbxError::Malformed("objects"));
        }

        let text = match format {
            PlistFormat::Ascii => std::str::from_utf8(data).ok().map(str::to_string),
            _ => None,
        };

        Ok(PbxProject {
            path: PathBuf::new(),
            root_object_id,
            format,
            text,
            document,
        })
    }

    /// Get the project name (from the .xcodeproj directory name).
    pub fn name(&self) -> String {
        self.path
            .parent()
            .and_then(Path::file_stem)
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn objects(&self) -> Option<&plist::Dictionary> {
        self.document.get("objects").and_then(Value::as_dictionary)
    }

    fn objects_mut(&mut self) -> Result<&mut plist::Dictionary, PbxError> {
        self.document
            .get_mut("objects")
            .and_then(Value::as_dictionary_mut)
            .ok_or(PbxError::Malformed("objects"))
    }

    /// Get an object by its ID.
    pub fn object(&self, id: &str) -> Option<&Value> {
        self.objects()?.get(id)
    }

    /// Get a string property from an object.
    pub fn get_string<'a>(&self, obj: &'a Value, key: &str) -> Option<&'a str> {
        obj.as_dictionary()?.get(key)?.as_string()
    }

    /// Get the string elements of an array property, usually object IDs.
    pub fn get_ids(&self, obj: &Value, key: &str) -> Vec<String> {
        obj.as_dictionary()
            .and_then(|d| d.get(key))
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_string)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get the root project object.
    pub fn root_object(&self) -> Option<&Value> {
        self.object(&self.root_object_id)
    }

    /// List all target IDs from the root project object, in declared order.
    pub fn target_ids(&self) -> Vec<String> {
        self.root_object()
            .map(|root| self.get_ids(root, "targets"))
            .unwrap_or_default()
    }

    /// The first entry of the root project's `targets` list that resolves to
    /// an object. Xcode lists the application target first when the project is
    /// generated, so this is the app target for template-based projects.
    pub fn first_target(&self) -> Option<Target> {
        self.target_ids().into_iter().find_map(|id| {
            let obj = self.object(&id)?;
            let name = self.get_string(obj, "name")?.to_string();
            Some(Target { id, name })
        })
    }

    /// IDs of the build configurations (Debug, Release, ...) in a configuration list.
    pub fn configuration_ids(&self, list_id: &str) -> Result<Vec<String>, PbxError> {
        let list = self
            .object(list_id)
            .ok_or_else(|| PbxError::MissingObject(list_id.to_string()))?;
        Ok(self.get_ids(list, "buildConfigurations"))
    }

    /// IDs of the build configurations owned by a target.
    pub fn target_configuration_ids(&self, target_id: &str) -> Result<Vec<String>, PbxError> {
        let target = self
            .object(target_id)
            .ok_or_else(|| PbxError::MissingObject(target_id.to_string()))?;
        let list_id = self
            .get_string(target, "buildConfigurationList")
            .ok_or_else(|| PbxError::MissingObject(format!("{target_id}.buildConfigurationList")))?
            .to_string();
        self.configuration_ids(&list_id)
    }

    /// Read one build setting of a build configuration.
    pub fn build_setting(&self, config_id: &str, key: &str) -> Option<&str> {
        self.object(config_id)?
            .as_dictionary()?
            .get("buildSettings")?
            .as_dictionary()?
            .get(key)?
            .as_string()
    }

    /// Set a build setting in every configuration of the given target.
    /// Returns the number of configurations updated.
    pub fn set_target_build_property(
        &mut self,
        target_id: &str,
        key: &str,
        value: &str,
    ) -> Result<usize, PbxError> {
        let config_ids = self.target_configuration_ids(target_id)?;

        if let Some(text) = &self.text {
            let mut edited = text.clone();
            for id in &config_ids {
                edited = edit::set_build_setting(&edited, id, key, value)
                    .ok_or_else(|| PbxError::MissingObject(format!("{id}.buildSettings")))?;
            }
            self.text = Some(edited);
        }

        let objects = self.objects_mut()?;

        for id in &config_ids {
            let config = objects
                .get_mut(id)
                .and_then(Value::as_dictionary_mut)
                .ok_or_else(|| PbxError::MissingObject(id.clone()))?;

            if !matches!(config.get("buildSettings"), Some(Value::Dictionary(_))) {
                config.insert(
                    "buildSettings".to_string(),
                    Value::Dictionary(plist::Dictionary::new()),
                );
            }
            if let Some(Value::Dictionary(settings)) = config.get_mut("buildSettings") {
                settings.insert(key.to_string(), Value::String(value.to_string()));
            }
            debug!(configuration = %id, key, value, "set build setting");
        }

        Ok(config_ids.len())
    }

    /// Set a build setting in every configuration of the first target.
    pub fn set_build_property(&mut self, key: &str, value: &str) -> Result<usize, PbxError> {
        let target = self.first_target().ok_or(PbxError::NoTarget)?;
        self.set_target_build_property(&target.id, key, value)
    }

    /// The project in the format it was read in.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PbxError> {
        match &self.text {
            Some(text) => Ok(text.clone().into_bytes()),
            None => Ok(variations_plist::serialize(
                &Value::Dictionary(self.document.clone()),
                self.format,
            )?),
        }
    }

    /// Write the project back to the path it was opened from.
    pub fn save(&self) -> Result<(), PbxError> {
        fs::write(&self.path, self.to_bytes()?).map_err(|source| PbxError::Write {
            path: self.path.clone(),
            source,
        })
    }
}
