//! Mod entity with its release history and latest pointer

use super::{CompatibilityRange, ModVersion};
use crate::error::VersionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A published release of a mod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModRelease {
    /// Release version
    pub version: ModVersion,
    /// Whether this release breaks compatibility with every earlier release
    #[serde(default)]
    pub breaking: bool,
    /// When the release was published, if known
    #[serde(default)]
    pub released_at: Option<DateTime<Utc>>,
}

impl ModRelease {
    /// Creates a non-breaking release
    pub fn new(version: ModVersion) -> Self {
        Self {
            version,
            breaking: false,
            released_at: None,
        }
    }

    /// Creates a release that opens a new compatibility band
    pub fn breaking(version: ModVersion) -> Self {
        Self {
            breaking: true,
            ..Self::new(version)
        }
    }

    /// Sets the release date
    pub fn with_released_at(mut self, released_at: DateTime<Utc>) -> Self {
        self.released_at = Some(released_at);
        self
    }
}

/// Pointer to the newest published version of a mod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestPointer {
    /// The version currently marked as latest
    pub version: ModVersion,
    /// When the pointer last moved
    pub updated_at: DateTime<Utc>,
}

/// A game mod: defines a blueprint grammar and a version history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMod {
    name: String,
    releases: Vec<ModRelease>,
    latest: LatestPointer,
}

impl GameMod {
    /// Creates a mod from its releases and latest pointer
    ///
    /// Releases are sorted; duplicate versions keep the first declaration.
    /// The latest pointer must name a known release.
    pub fn new(
        name: impl Into<String>,
        releases: Vec<ModRelease>,
        latest: LatestPointer,
    ) -> Result<Self, VersionError> {
        let name = name.into();
        if releases.is_empty() {
            return Err(VersionError::EmptyReleaseList { mod_name: name });
        }

        let mut releases = releases;
        releases.sort_by(|a, b| a.version.cmp(&b.version));
        releases.dedup_by(|b, a| a.version == b.version);

        let game_mod = Self {
            name,
            releases,
            latest,
        };

        if game_mod.index_of(&game_mod.latest.version).is_none() {
            return Err(VersionError::LatestUnresolvable {
                mod_name: game_mod.name,
                version: game_mod.latest.version.to_string(),
            });
        }

        Ok(game_mod)
    }

    /// Creates a mod whose latest pointer is its highest release
    pub fn with_releases(
        name: impl Into<String>,
        releases: Vec<ModRelease>,
    ) -> Result<Self, VersionError> {
        let name = name.into();
        let highest = releases
            .iter()
            .map(|r| &r.version)
            .max()
            .cloned()
            .ok_or_else(|| VersionError::EmptyReleaseList {
                mod_name: name.clone(),
            })?;

        Self::new(
            name,
            releases,
            LatestPointer {
                version: highest,
                updated_at: Utc::now(),
            },
        )
    }

    /// Returns the mod name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns releases in ascending order
    pub fn releases(&self) -> &[ModRelease] {
        &self.releases
    }

    /// Returns the latest pointer
    pub fn latest(&self) -> &LatestPointer {
        &self.latest
    }

    /// Returns true if the version is a known release
    pub fn knows(&self, version: &ModVersion) -> bool {
        self.index_of(version).is_some()
    }

    /// Returns the release for a version
    pub fn release(&self, version: &ModVersion) -> Option<&ModRelease> {
        self.index_of(version).map(|idx| &self.releases[idx])
    }

    fn index_of(&self, version: &ModVersion) -> Option<usize> {
        self.releases
            .binary_search_by(|r| r.version.cmp(version))
            .ok()
    }

    /// Compatibility window of the band containing `version`
    ///
    /// The band starts at the closest breaking release at or below `version`
    /// (or the first release) and ends right before the next breaking release
    /// (or at the last release).
    pub fn range_for(&self, version: &ModVersion) -> Result<CompatibilityRange, VersionError> {
        let idx = self
            .index_of(version)
            .ok_or_else(|| VersionError::unknown_version(&self.name, version))?;

        let lower_idx = self.releases[..=idx]
            .iter()
            .rposition(|r| r.breaking)
            .unwrap_or(0);

        let upper_idx = self.releases[idx + 1..]
            .iter()
            .position(|r| r.breaking)
            .map(|offset| idx + offset)
            .unwrap_or(self.releases.len() - 1);

        Ok(CompatibilityRange::new(
            self.releases[lower_idx].version.clone(),
            self.releases[upper_idx].version.clone(),
        ))
    }

    /// Adds a release and moves the latest pointer to it when it is newer
    ///
    /// Returns false if the version was already known.
    pub fn publish(&mut self, release: ModRelease, at: DateTime<Utc>) -> bool {
        match self
            .releases
            .binary_search_by(|r| r.version.cmp(&release.version))
        {
            Ok(_) => false,
            Err(pos) => {
                if release.version > self.latest.version {
                    self.latest = LatestPointer {
                        version: release.version.clone(),
                        updated_at: at,
                    };
                }
                self.releases.insert(pos, release);
                true
            }
        }
    }
}
