use serde::{Deserialize, Serialize};

/// iOS settings of a variation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IosProfile {
    pub display_name: String,
    #[serde(alias = "id")]
    pub bundle_id: String,
    /// Signing team identifier written to `DEVELOPMENT_TEAM`.
    #[serde(default)]
    pub xcode_team: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Android settings of a variation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AndroidProfile {
    pub display_name: String,
    #[serde(alias = "id")]
    pub bundle_id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One entry of the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationProfile {
    pub name: String,
    pub ios: IosProfile,
    pub android: AndroidProfile,
    /// Fields this tool does not know about, kept so a rewrite does not drop them.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl VariationProfile {
    /// The profile written for a freshly added variation.
    pub fn with_defaults(name: &str) -> Self {
        let bundle_id = format!("com.example.{}", slug(name));
        VariationProfile {
            name: name.to_string(),
            ios: IosProfile {
                display_name: name.to_string(),
                bundle_id: bundle_id.clone(),
                xcode_team: String::new(),
                extra: serde_json::Map::new(),
            },
            android: AndroidProfile {
                display_name: name.to_string(),
                bundle_id,
                extra: serde_json::Map::new(),
            },
            extra: serde_json::Map::new(),
        }
    }
}

fn slug(name: &str) -> String {
    let slug: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if slug.is_empty() {
        "app".to_string()
    } else {
        slug
    }
}

/// Check that a name can be used both as a registry key and as a folder name.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("variation name must not be empty".to_string());
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(format!("variation name {name:?} is not a valid folder name"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let profile = VariationProfile::with_defaults("Acme Corp");
        assert_eq!(profile.name, "Acme Corp");
        assert_eq!(profile.ios.display_name, "Acme Corp");
        assert_eq!(profile.ios.bundle_id, "com.example.acmecorp");
        assert_eq!(profile.android.bundle_id, "com.example.acmecorp");
        assert_eq!(profile.ios.xcode_team, "");
        assert_eq!(VariationProfile::with_defaults("ÄÖ").ios.bundle_id, "com.example.app");
    }

    #[test]
    fn test_field_names() {
        let json = serde_json::to_value(VariationProfile::with_defaults("Beta")).unwrap();
        assert_eq!(json["ios"]["displayName"], "Beta");
        assert_eq!(json["ios"]["bundleId"], "com.example.beta");
        assert_eq!(json["ios"]["xcodeTeam"], "");
        assert_eq!(json["android"]["bundleId"], "com.example.beta");
    }

    #[test]
    fn test_legacy_id_and_extra_fields() {
        let json = r#"{
            "name": "Old",
            "ios": { "displayName": "Old", "id": "com.old", "xcodeTeam": "T1", "icon": { "path": "old.png" } },
            "android": { "displayName": "Old", "id": "com.old.android", "versionCode": 7 },
            "comment": "kept"
        }"#;
        let profile: VariationProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.ios.bundle_id, "com.old");
        assert_eq!(profile.android.bundle_id, "com.old.android");
        assert_eq!(profile.extra["comment"], "kept");
        assert_eq!(profile.ios.extra["icon"]["path"], "old.png");
        assert_eq!(profile.android.extra["versionCode"], 7);

        let back = serde_json::to_value(&profile).unwrap();
        assert_eq!(back["comment"], "kept");
        assert_eq!(back["ios"]["icon"]["path"], "old.png");
        assert_eq!(back["android"]["versionCode"], 7);
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Acme").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("  ").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
    }
}
