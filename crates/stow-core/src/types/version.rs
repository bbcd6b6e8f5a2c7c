//! Package versions and version ranges.
//!
//! Versions have one to four numeric parts with optional prerelease labels
//! and build metadata (`1.2.3.4-beta.1+sha.abc`). Ranges use interval
//! notation: `[1.0, 2.0)`, `(, 3.0]`, exact `[1.2.3]`, and a bare `1.0`
//! meaning `[1.0, )`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Package version (major.minor.patch[.revision][-prerelease][+build])
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub revision: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

/// Interval of acceptable versions
///
/// A missing bound is unbounded; its inclusive flag is always `false` so that
/// structurally equal ranges compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionRange {
    pub min: Option<Version>,
    pub min_inclusive: bool,
    pub max: Option<Version>,
    pub max_inclusive: bool,
}

/// Version parsing and validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version format: {input}")]
    InvalidFormat { input: String },

    #[error("Invalid number in version: {component}")]
    InvalidNumber { component: String },

    #[error("Invalid prerelease identifier: {prerelease}")]
    InvalidPrerelease { prerelease: String },

    #[error("Invalid build metadata: {build}")]
    InvalidBuild { build: String },

    #[error("Invalid version range '{input}': {reason}")]
    InvalidRange { input: String, reason: String },
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            revision: 0,
            prerelease: None,
            build: None,
        }
    }

    /// Attach a prerelease label
    pub fn with_prerelease(mut self, prerelease: impl Into<String>) -> Self {
        self.prerelease = Some(prerelease.into());
        self
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Version without build metadata, as used in lock-file keys
    pub fn to_normalized_string(&self) -> String {
        let mut out = format!("{}.{}.{}", self.major, self.minor, self.patch);
        if self.revision != 0 {
            out.push_str(&format!(".{}", self.revision));
        }
        if let Some(pre) = &self.prerelease {
            out.push('-');
            out.push_str(pre);
        }
        out
    }

    /// Compare precedence, ignoring build metadata
    fn precedence_cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch, self.revision)
            .cmp(&(other.major, other.minor, other.patch, other.revision))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => compare_prerelease(a, b),
            })
    }
}

/// Dot-separated label comparison: numeric identifiers sort numerically and
/// before alphanumeric ones, which compare case-insensitively.
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let l_numeric = !l.is_empty() && l.bytes().all(|b| b.is_ascii_digit());
                let r_numeric = !r.is_empty() && r.bytes().all(|b| b.is_ascii_digit());

                let ord = match (l_numeric, r_numeric) {
                    // Longer digit strings are larger once leading zeros are gone
                    (true, true) => {
                        let l = l.trim_start_matches('0');
                        let r = r.trim_start_matches('0');
                        l.len().cmp(&r.len()).then_with(|| l.cmp(r))
                    },
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    (false, false) => l.to_ascii_lowercase().cmp(&r.to_ascii_lowercase()),
                };

                if ord != Ordering::Equal {
                    return ord;
                }
            },
        }
    }
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.precedence_cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.revision.hash(state);
        if let Some(pre) = &self.prerelease {
            // Must agree with compare_prerelease: numeric parts ignore leading zeros
            for part in pre.split('.') {
                if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) {
                    part.trim_start_matches('0').hash(state);
                } else {
                    part.to_ascii_lowercase().hash(state);
                }
            }
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.precedence_cmp(other)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(VersionError::InvalidFormat {
                input: s.to_string(),
            });
        }

        let (rest, build) = match input.split_once('+') {
            Some((rest, build)) => {
                if !is_valid_label(build) {
                    return Err(VersionError::InvalidBuild {
                        build: build.to_string(),
                    });
                }
                (rest, Some(build.to_string()))
            },
            None => (input, None),
        };

        let (core, prerelease) = match rest.split_once('-') {
            Some((core, pre)) => {
                if !is_valid_label(pre) {
                    return Err(VersionError::InvalidPrerelease {
                        prerelease: pre.to_string(),
                    });
                }
                (core, Some(pre.to_string()))
            },
            None => (rest, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.is_empty() || parts.len() > 4 {
            return Err(VersionError::InvalidFormat {
                input: s.to_string(),
            });
        }

        let mut numbers = [0u64; 4];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionError::InvalidNumber {
                    component: part.to_string(),
                });
            }
            *slot = part.parse().map_err(|_| VersionError::InvalidNumber {
                component: part.to_string(),
            })?;
        }

        Ok(Version {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            revision: numbers[3],
            prerelease,
            build,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_normalized_string())?;
        if let Some(build) = &self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

impl VersionRange {
    /// Range accepting every version
    pub fn all() -> Self {
        Self {
            min: None,
            min_inclusive: false,
            max: None,
            max_inclusive: false,
        }
    }

    /// `[version, )`
    pub fn at_least(version: Version) -> Self {
        Self {
            min: Some(version),
            min_inclusive: true,
            max: None,
            max_inclusive: false,
        }
    }

    /// `[version]`
    pub fn exact(version: Version) -> Self {
        Self {
            min: Some(version.clone()),
            min_inclusive: true,
            max: Some(version),
            max_inclusive: true,
        }
    }

    /// Range with explicit bounds; fails if no version could satisfy it
    pub fn between(
        min: Option<Version>,
        min_inclusive: bool,
        max: Option<Version>,
        max_inclusive: bool,
    ) -> Result<Self, VersionError> {
        let range = Self {
            min_inclusive: min_inclusive && min.is_some(),
            max_inclusive: max_inclusive && max.is_some(),
            min,
            max,
        };

        if range.is_empty() {
            return Err(VersionError::InvalidRange {
                input: range.to_string(),
                reason: "no version can satisfy this range".to_string(),
            });
        }
        Ok(range)
    }

    /// Parse interval notation
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self::all());
        }

        let invalid = |reason: &str| VersionError::InvalidRange {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let first = trimmed.chars().next().unwrap_or_default();
        if first != '[' && first != '(' {
            return Ok(Self::at_least(trimmed.parse()?));
        }

        let last = trimmed.chars().last().unwrap_or_default();
        if last != ']' && last != ')' {
            return Err(invalid("missing closing bracket"));
        }
        if trimmed.len() < 2 {
            return Err(invalid("missing closing bracket"));
        }

        let inner = &trimmed[1..trimmed.len() - 1];
        match inner.split_once(',') {
            None => {
                if first != '[' || last != ']' {
                    return Err(invalid("an exact version must use square brackets"));
                }
                Ok(Self::exact(inner.trim().parse()?))
            },
            Some((lower, upper)) => {
                if upper.contains(',') {
                    return Err(invalid("too many bounds"));
                }
                let lower = lower.trim();
                let upper = upper.trim();
                let min = if lower.is_empty() { None } else { Some(lower.parse()?) };
                let max = if upper.is_empty() { None } else { Some(upper.parse()?) };

                Self::between(min, first == '[', max, last == ']').map_err(|_| invalid("no version can satisfy this range"))
            },
        }
    }

    /// Check if a version lies within this range
    pub fn satisfies(&self, version: &Version) -> bool {
        let above_min = match &self.min {
            None => true,
            Some(min) if self.min_inclusive => version >= min,
            Some(min) => version > min,
        };
        let below_max = match &self.max {
            None => true,
            Some(max) if self.max_inclusive => version <= max,
            Some(max) => version < max,
        };
        above_min && below_max
    }

    /// Intersection of two ranges, or `None` when they are disjoint
    pub fn intersect(&self, other: &VersionRange) -> Option<VersionRange> {
        let (min, min_inclusive) = match (&self.min, &other.min) {
            (None, None) => (None, false),
            (Some(a), None) => (Some(a.clone()), self.min_inclusive),
            (None, Some(b)) => (Some(b.clone()), other.min_inclusive),
            (Some(a), Some(b)) => match a.cmp(b) {
                Ordering::Greater => (Some(a.clone()), self.min_inclusive),
                Ordering::Less => (Some(b.clone()), other.min_inclusive),
                Ordering::Equal => (Some(a.clone()), self.min_inclusive && other.min_inclusive),
            },
        };

        let (max, max_inclusive) = match (&self.max, &other.max) {
            (None, None) => (None, false),
            (Some(a), None) => (Some(a.clone()), self.max_inclusive),
            (None, Some(b)) => (Some(b.clone()), other.max_inclusive),
            (Some(a), Some(b)) => match a.cmp(b) {
                Ordering::Less => (Some(a.clone()), self.max_inclusive),
                Ordering::Greater => (Some(b.clone()), other.max_inclusive),
                Ordering::Equal => (Some(a.clone()), self.max_inclusive && other.max_inclusive),
            },
        };

        let range = VersionRange {
            min,
            min_inclusive,
            max,
            max_inclusive,
        };
        if range.is_empty() {
            None
        } else {
            Some(range)
        }
    }

    /// Check if the range pins exactly one version
    pub fn is_exact(&self) -> bool {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) => self.min_inclusive && self.max_inclusive && min == max,
            _ => false,
        }
    }

    /// Check if either bound is a prerelease, which opts the range into prereleases
    pub fn has_prerelease_bound(&self) -> bool {
        self.min.as_ref().is_some_and(Version::is_prerelease)
            || self.max.as_ref().is_some_and(Version::is_prerelease)
    }

    /// Check if the range accepts every version
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    fn is_empty(&self) -> bool {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) => match min.cmp(max) {
                Ordering::Greater => true,
                Ordering::Equal => !(self.min_inclusive && self.max_inclusive),
                Ordering::Less => false,
            },
            _ => false,
        }
    }
}

impl Default for VersionRange {
    fn default() -> Self {
        Self::all()
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unbounded() {
            return write!(f, "*");
        }
        if self.is_exact() {
            if let Some(version) = &self.min {
                return write!(f, "[{}]", version);
            }
        }

        let open = if self.min_inclusive { '[' } else { '(' };
        let close = if self.max_inclusive { ']' } else { ')' };
        let min = self.min.as_ref().map(Version::to_string).unwrap_or_default();
        let max = self.max.as_ref().map(Version::to_string).unwrap_or_default();
        write!(f, "{}{}, {}{}", open, min, max, close)
    }
}

impl TryFrom<String> for VersionRange {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VersionRange> for String {
    fn from(range: VersionRange) -> Self {
        range.to_string()
    }
}
