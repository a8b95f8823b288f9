//! User profile
//!
//! Small optional JSON file selecting the label and avatar marker shown
//! next to the user's messages. Anything missing or unreadable falls back
//! to the defaults.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_USER_LABEL: &str = "You";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
}

impl Profile {
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(target: "ui", "no profile at {}: {}", path.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(profile) => profile,
            Err(e) => {
                debug!(target: "ui", "ignoring invalid profile {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_USER_LABEL)
    }

    pub fn has_photo(&self) -> bool {
        self.photo
            .as_deref()
            .is_some_and(|photo| !photo.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_profile(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_name_and_photo() {
        let file = write_profile(r#"{"name":"Ada","photo":"ada.png"}"#);
        let profile = Profile::load(file.path());
        assert_eq!(profile.display_name(), "Ada");
        assert!(profile.has_photo());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let profile = Profile::load("definitely/not/a/profile.json");
        assert_eq!(profile.display_name(), DEFAULT_USER_LABEL);
        assert!(!profile.has_photo());
    }

    #[test]
    fn invalid_json_falls_back_to_defaults() {
        let file = write_profile("{not json");
        let profile = Profile::load(file.path());
        assert_eq!(profile.display_name(), DEFAULT_USER_LABEL);
    }

    #[test]
    fn blank_name_uses_the_default_label() {
        let file = write_profile(r#"{"name":"   "}"#);
        let profile = Profile::load(file.path());
        assert_eq!(profile.display_name(), DEFAULT_USER_LABEL);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let file = write_profile(r#"{"name":"Ada","theme":"dark"}"#);
        let profile = Profile::load(file.path());
        assert_eq!(profile.display_name(), "Ada");
    }
}
