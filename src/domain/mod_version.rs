//! Mod version values
//!
//! Mod versions follow `major.minor.patch[(.|-)suffix]` with an optional
//! leading `v`:
//! - `2.0.6` plain release
//! - `2.0.6-beta.1` pre-release, orders before `2.0.6`
//! - `2.0.6.1` revision, orders after `2.0.6`
//!
//! Ordering is semantic, never lexical: `2.9.0 < 2.10.0`.

use crate::error::VersionError;
use regex::Regex;
use semver::{BuildMetadata, Prerelease, Version};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[vV]?(\d+)\.(\d+)\.(\d+)(?:([.-])([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?$")
        .unwrap()
});

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>\S.*?)\s*-\s*(?P<version>[vV]?\d+\.\d+\.\d+(?:[.-][0-9A-Za-z.-]+)?)$")
        .unwrap()
});

/// A semantic mod version
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModVersion {
    version: Version,
}

impl ModVersion {
    /// Creates a plain `major.minor.patch` version
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            version: Version::new(major, minor, patch),
        }
    }

    /// Parses a version string
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        let caps = VERSION_RE.captures(trimmed).ok_or_else(|| {
            VersionError::invalid(input, "expected major.minor.patch with optional suffix")
        })?;

        let number = |idx: usize| -> Result<u64, VersionError> {
            caps[idx]
                .parse::<u64>()
                .map_err(|e| VersionError::invalid(input, e.to_string()))
        };

        let mut version = Version::new(number(1)?, number(2)?, number(3)?);

        if let (Some(sep), Some(suffix)) = (caps.get(4), caps.get(5)) {
            if sep.as_str() == "-" {
                version.pre = Prerelease::new(suffix.as_str())
                    .map_err(|e| VersionError::invalid(input, e.to_string()))?;
            } else {
                version.build = BuildMetadata::new(suffix.as_str())
                    .map_err(|e| VersionError::invalid(input, e.to_string()))?;
            }
        }

        Ok(Self { version })
    }

    /// Returns the underlying semver value
    pub fn as_semver(&self) -> &Version {
        &self.version
    }

    /// Returns the major component
    pub fn major(&self) -> u64 {
        self.version.major
    }

    /// Returns the minor component
    pub fn minor(&self) -> u64 {
        self.version.minor
    }

    /// Returns the patch component
    pub fn patch(&self) -> u64 {
        self.version.patch
    }

    /// Returns true for `-suffix` versions
    pub fn is_prerelease(&self) -> bool {
        !self.version.pre.is_empty()
    }

    /// Returns the `.suffix` revision, if any
    pub fn revision(&self) -> Option<&str> {
        if self.version.build.is_empty() {
            None
        } else {
            Some(self.version.build.as_str())
        }
    }
}

impl fmt::Display for ModVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.version.major, self.version.minor, self.version.patch
        )?;
        if !self.version.pre.is_empty() {
            write!(f, "-{}", self.version.pre)?;
        }
        if !self.version.build.is_empty() {
            write!(f, ".{}", self.version.build)?;
        }
        Ok(())
    }
}

impl FromStr for ModVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ModVersion {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ModVersion> for String {
    fn from(value: ModVersion) -> Self {
        value.to_string()
    }
}

/// Renders the `"<mod> - <version>"` label shown next to a blueprint
pub fn formatted_mod_version(mod_name: &str, version: &ModVersion) -> String {
    format!("{} - {}", mod_name, version)
}

/// A parsed `"<mod> - <version>"` label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModLabel {
    /// Mod name
    pub mod_name: String,
    /// Mod version
    pub version: ModVersion,
}

impl ModLabel {
    /// Parses a label such as `MultiBuildBeta - 2.0.6`
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        let caps = LABEL_RE
            .captures(trimmed)
            .ok_or_else(|| VersionError::invalid(input, "unregistered mod or version format"))?;

        Ok(Self {
            mod_name: caps["name"].trim().to_string(),
            version: ModVersion::parse(&caps["version"])?,
        })
    }
}

impl fmt::Display for ModLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", formatted_mod_version(&self.mod_name, &self.version))
    }
}
