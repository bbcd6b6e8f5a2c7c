//! Target framework monikers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Target framework moniker such as `net8.0` or `netstandard2.0`
///
/// Monikers are opaque to the resolver. They compare case-insensitively and
/// are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TargetFramework(String);

impl TargetFramework {
    pub fn new(moniker: impl AsRef<str>) -> Self {
        Self(moniker.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TargetFramework {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for TargetFramework {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<TargetFramework> for String {
    fn from(framework: TargetFramework) -> Self {
        framework.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive() {
        assert_eq!(TargetFramework::new("NET8.0"), TargetFramework::new("net8.0"));
        assert_eq!(TargetFramework::new(" net8.0 ").as_str(), "net8.0");
    }

    #[test]
    fn test_serde() {
        let tf: TargetFramework = serde_json::from_str("\"NetStandard2.0\"").unwrap();
        assert_eq!(tf.to_string(), "netstandard2.0");
        assert_eq!(serde_json::to_string(&tf).unwrap(), "\"netstandard2.0\"");
    }
}
