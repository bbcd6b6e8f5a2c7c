//! Package source references.

use serde::{Deserialize, Serialize};

/// A configured package source: display name plus location (folder or URL)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageSourceRef {
    pub name: String,
    pub source: String,
    #[serde(default = "default_enabled", skip_serializing_if = "is_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

fn is_enabled(enabled: &bool) -> bool {
    *enabled
}

impl PackageSourceRef {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            enabled: true,
        }
    }

    /// Source named after its location
    pub fn from_location(location: impl Into<String>) -> Self {
        let location = location.into();
        Self::new(location.clone(), location)
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Location used to detect duplicate sources
    pub fn normalized_location(&self) -> String {
        self.source
            .trim()
            .trim_end_matches(['/', '\\'])
            .to_ascii_lowercase()
    }

    /// Check if the location is a folder rather than a remote endpoint
    pub fn is_local(&self) -> bool {
        let location = self.source.trim();
        location.starts_with("file://") || !location.contains("://")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_location() {
        let a = PackageSourceRef::new("a", "https://Feed.Example/v3/");
        let b = PackageSourceRef::new("b", "https://feed.example/v3");
        assert_eq!(a.normalized_location(), b.normalized_location());
    }

    #[test]
    fn test_is_local() {
        assert!(PackageSourceRef::from_location("/var/feed").is_local());
        assert!(PackageSourceRef::from_location("file:///var/feed").is_local());
        assert!(!PackageSourceRef::from_location("https://feed.example/v3").is_local());
    }

    #[test]
    fn test_enabled_defaults_to_true() {
        let source: PackageSourceRef = serde_json::from_str(r#"{ "name": "x", "source": "/feed" }"#).unwrap();
        assert!(source.enabled);
        assert_eq!(serde_json::to_string(&source).unwrap(), r#"{"name":"x","source":"/feed"}"#);
    }
}
