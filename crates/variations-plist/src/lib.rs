pub mod ascii;

use plist::Value;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Manifest key holding the user-visible application name.
pub const DISPLAY_NAME_KEY: &str = "CFBundleDisplayName";

#[derive(Error, Debug)]
pub enum PlistError {
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
    #[error("plist error: {0}")]
    Plist(#[from] plist::Error),
    #[error("ASCII parse error: {0}")]
    AsciiParse(String),
    #[error("unknown format")]
    UnknownFormat,
    #[error("top-level object is not a dictionary")]
    NotADictionary,
}

/// Plist formats supported by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlistFormat {
    Xml,
    Binary,
    Ascii,
}

impl PlistFormat {
    pub fn name(&self) -> &'static str {
        match self {
            PlistFormat::Xml => "xml1",
            PlistFormat::Binary => "binary1",
            PlistFormat::Ascii => "openstep1",
        }
    }
}

/// Detect the format of a plist file from its contents.
pub fn identify_format(data: &[u8]) -> Option<PlistFormat> {
    if data.starts_with(b"bplist00") {
        return Some(PlistFormat::Binary);
    }

    let trimmed = skip_whitespace_and_bom(data);

    if trimmed.starts_with(b"<?xml")
        || trimmed.starts_with(b"<plist")
        || trimmed.starts_with(b"<!DOCTYPE")
    {
        return Some(PlistFormat::Xml);
    }

    match trimmed.first() {
        Some(b'{') | Some(b'(') | Some(b'"') | Some(b'/') => Some(PlistFormat::Ascii),
        Some(c) if c.is_ascii_alphanumeric() => Some(PlistFormat::Ascii),
        _ => None,
    }
}

fn skip_whitespace_and_bom(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    &data[start..]
}

/// Deserialize plist data in any supported format.
pub fn deserialize(data: &[u8]) -> Result<(Value, PlistFormat), PlistError> {
    let format = identify_format(data).ok_or(PlistError::UnknownFormat)?;
    let value = deserialize_with_format(data, format)?;
    Ok((value, format))
}

/// Deserialize plist data with a known format.
pub fn deserialize_with_format(data: &[u8], format: PlistFormat) -> Result<Value, PlistError> {
    match format {
        PlistFormat::Xml | PlistFormat::Binary => Ok(Value::from_reader(Cursor::new(data))?),
        PlistFormat::Ascii => {
            let text =
                std::str::from_utf8(data).map_err(|e| PlistError::AsciiParse(e.to_string()))?;
            ascii::parse(text).map_err(|e| PlistError::AsciiParse(e.to_string()))
        }
    }
}

/// Serialize a plist value to bytes in the given format.
pub fn serialize(value: &Value, format: PlistFormat) -> Result<Vec<u8>, PlistError> {
    match format {
        PlistFormat::Xml => {
            let mut buf = Vec::new();
            value.to_writer_xml(&mut buf)?;
            buf.push(b'\n');
            Ok(buf)
        }
        PlistFormat::Binary => {
            let mut buf = Vec::new();
            value.to_writer_binary(&mut buf)?;
            Ok(buf)
        }
        PlistFormat::Ascii => Ok(ascii::write(value).into_bytes()),
    }
}

/// An application manifest (`Info.plist`) loaded from disk.
///
/// The format found on disk is remembered and reused on save, so an XML
/// manifest stays XML and a binary one stays binary.
#[derive(Debug, Clone)]
pub struct PropertyList {
    pub path: PathBuf,
    pub format: PlistFormat,
    root: plist::Dictionary,
}

impl PropertyList {
    pub fn open(path: impl AsRef<Path>) -> Result<PropertyList, PlistError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| PlistError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut list = PropertyList::from_bytes(&data)?;
        list.path = path.to_path_buf();
        debug!(path = %path.display(), format = list.format.name(), "loaded property list");
        Ok(list)
    }

    pub fn from_bytes(data: &[u8]) -> Result<PropertyList, PlistError> {
        let (value, format) = deserialize(data)?;
        let root = value.into_dictionary().ok_or(PlistError::NotADictionary)?;
        Ok(PropertyList {
            path: PathBuf::new(),
            format,
            root,
        })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.root.get(key).and_then(Value::as_string)
    }

    /// Set a top-level string value. Existing keys keep their position.
    pub fn set_string(&mut self, key: &str, value: &str) {
        self.root
            .insert(key.to_string(), Value::String(value.to_string()));
    }

    pub fn display_name(&self) -> Option<&str> {
        self.get_string(DISPLAY_NAME_KEY)
    }

    pub fn set_display_name(&mut self, value: &str) {
        self.set_string(DISPLAY_NAME_KEY, value);
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PlistError> {
        serialize(&Value::Dictionary(self.root.clone()), self.format)
    }

    /// Write the manifest back to the path it was opened from.
    pub fn save(&self) -> Result<(), PlistError> {
        let data = self.to_bytes()?;
        fs::write(&self.path, data).map_err(|source| PlistError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>CFBundleDevelopmentRegion</key>
	<string>en</string>
	<key>CFBundleDisplayName</key>
	<string>Old Name</string>
	<key>NSAppTransportSecurity</key>
	<dict>
		<key>NSAllowsArbitraryLoads</key>
		<true/>
	</dict>
	<key>UISupportedInterfaceOrientations</key>
	<array>
		<string>UIInterfaceOrientationPortrait</string>
	</array>
	<key>LSRequiresIPhoneOS</key>
	<true/>
</dict>
</plist>
"#;

    #[test]
    fn test_identify_xml() {
        let data = b"<?xml version=\"1.0\"?><plist><dict/></plist>";
        assert_eq!(identify_format(data), Some(PlistFormat::Xml));
    }

    #[test]
    fn test_identify_binary() {
        let mut data = vec![0u8; 32];
        data[..8].copy_from_slice(b"bplist00");
        assert_eq!(identify_format(&data), Some(PlistFormat::Binary));
    }

    #[test]
    fn test_identify_ascii_project() {
        assert_eq!(
            identify_format(b"// !$*UTF8*$!\n{ a = b; }"),
            Some(PlistFormat::Ascii)
        );
        assert_eq!(identify_format(b"   "), None);
    }

    #[test]
    fn test_set_display_name_keeps_other_keys() {
        let mut list = PropertyList::from_bytes(INFO_PLIST.as_bytes()).unwrap();
        assert_eq!(list.format, PlistFormat::Xml);
        assert_eq!(list.display_name(), Some("Old Name"));

        list.set_display_name("Acme App");
        let data = list.to_bytes().unwrap();
        let reparsed = PropertyList::from_bytes(&data).unwrap();

        assert_eq!(reparsed.format, PlistFormat::Xml);
        assert_eq!(reparsed.display_name(), Some("Acme App"));
        let original = PropertyList::from_bytes(INFO_PLIST.as_bytes()).unwrap();
        for (key, value) in original.root.iter() {
            if key != DISPLAY_NAME_KEY {
                assert_eq!(reparsed.get(key), Some(value), "key {key} changed");
            }
        }
        let keys: Vec<_> = reparsed.root.keys().cloned().collect();
        let original_keys: Vec<_> = original.root.keys().cloned().collect();
        assert_eq!(keys, original_keys);
    }

    #[test]
    fn test_binary_stays_binary() {
        let xml = PropertyList::from_bytes(INFO_PLIST.as_bytes()).unwrap();
        let binary = serialize(&Value::Dictionary(xml.root.clone()), PlistFormat::Binary).unwrap();

        let mut list = PropertyList::from_bytes(&binary).unwrap();
        assert_eq!(list.format, PlistFormat::Binary);
        list.set_display_name("Beta");
        let data = list.to_bytes().unwrap();
        assert!(data.starts_with(b"bplist00"));
        assert_eq!(
            PropertyList::from_bytes(&data).unwrap().display_name(),
            Some("Beta")
        );
    }

    #[test]
    fn test_missing_key_is_added() {
        let data = b"<?xml version=\"1.0\"?><plist version=\"1.0\"><dict><key>A</key><string>b</string></dict></plist>";
        let mut list = PropertyList::from_bytes(data).unwrap();
        assert_eq!(list.display_name(), None);
        list.set_display_name("New");
        assert_eq!(list.display_name(), Some("New"));
        assert_eq!(list.get_string("A"), Some("b"));
    }

    #[test]
    fn test_open_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Info.plist");
        fs::write(&path, INFO_PLIST).unwrap();

        let mut list = PropertyList::open(&path).unwrap();
        list.set_display_name("Saved");
        list.save().unwrap();

        assert_eq!(
            PropertyList::open(&path).unwrap().display_name(),
            Some("Saved")
        );
    }

    #[test]
    fn test_malformed_is_error() {
        assert!(PropertyList::from_bytes(b"<?xml version=\"1.0\"?><plist><dict><key>").is_err());
        assert!(matches!(
            PropertyList::from_bytes(b"(a, b)"),
            Err(PlistError::NotADictionary)
        ));
        let err = PropertyList::open("/nonexistent/Info.plist").unwrap_err();
        assert!(matches!(err, PlistError::Read { .. }));
    }
}
