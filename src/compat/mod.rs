//! Mod-version compatibility resolution
//!
//! This module provides:
//! - Compatibility ranges for a blueprint's mod version
//! - The legacy merge rule for old versions
//! - The "is this the newest version" check used for display

use crate::domain::{CompatibilityRange, GameMod, ModVersion};
use crate::error::VersionError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Highest version covered by the legacy merge rule
///
/// Versions at or below it are compatible up to the latest band's ceiling.
pub const LEGACY_MERGE_CEILING: ModVersion = ModVersion::new(2, 0, 6);

/// Widens the upper bound of old versions to the latest band's ceiling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyMergeRule {
    ceiling: ModVersion,
}

impl LegacyMergeRule {
    /// Create a rule covering versions up to and including `ceiling`
    pub fn new(ceiling: ModVersion) -> Self {
        Self { ceiling }
    }

    /// Returns the inclusive ceiling
    pub fn ceiling(&self) -> &ModVersion {
        &self.ceiling
    }

    /// Returns true if the rule applies to `version`
    pub fn applies_to(&self, version: &ModVersion) -> bool {
        version <= &self.ceiling
    }
}

impl Default for LegacyMergeRule {
    fn default() -> Self {
        Self::new(LEGACY_MERGE_CEILING)
    }
}

/// Resolves compatibility ranges against a mod snapshot
#[derive(Debug, Clone, Default)]
pub struct CompatibilityResolver {
    legacy: LegacyMergeRule,
}

impl CompatibilityResolver {
    /// Create a resolver with the default legacy rule
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with a custom legacy rule
    pub fn with_legacy_rule(legacy: LegacyMergeRule) -> Self {
        Self { legacy }
    }

    /// Returns the legacy rule in effect
    pub fn legacy_rule(&self) -> &LegacyMergeRule {
        &self.legacy
    }

    /// Compatibility range of `version` within `game_mod`
    pub fn compatibility_range(
        &self,
        game_mod: &GameMod,
        version: &ModVersion,
    ) -> Result<CompatibilityRange, VersionError> {
        let own = game_mod.range_for(version)?;

        if !self.legacy.applies_to(version) {
            return Ok(own);
        }

        let latest = &game_mod.latest().version;
        let latest_range = game_mod.range_for(latest).map_err(|_| {
            VersionError::LatestUnresolvable {
                mod_name: game_mod.name().to_string(),
                version: latest.to_string(),
            }
        })?;

        Ok(CompatibilityRange::new(own.lower, latest_range.upper))
    }

    /// Returns true if `version` is at or past the mod's latest release
    pub fn is_latest(&self, game_mod: &GameMod, version: &ModVersion) -> bool {
        is_latest(game_mod, version)
    }

    /// Everything shown next to a blueprint's mod version
    pub fn report(
        &self,
        game_mod: &GameMod,
        version: &ModVersion,
    ) -> Result<CompatReport, VersionError> {
        let range = self.compatibility_range(game_mod, version)?;
        let latest = game_mod.latest();
        Ok(CompatReport {
            mod_name: game_mod.name().to_string(),
            version: version.clone(),
            range,
            legacy_merged: self.legacy.applies_to(version),
            latest: latest.version.clone(),
            latest_updated_at: latest.updated_at,
            is_latest: self.is_latest(game_mod, version),
        })
    }
}

/// Resolved compatibility information for one mod version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatReport {
    pub mod_name: String,
    pub version: ModVersion,
    pub range: CompatibilityRange,
    /// Whether the legacy merge rule widened the range
    pub legacy_merged: bool,
    pub latest: ModVersion,
    pub latest_updated_at: DateTime<Utc>,
    pub is_latest: bool,
}

/// Compatibility range using the default legacy rule
pub fn compatibility_range(
    game_mod: &GameMod,
    version: &ModVersion,
) -> Result<CompatibilityRange, VersionError> {
    CompatibilityResolver::new().compatibility_range(game_mod, version)
}

/// Returns true if `version` is at or past the mod's latest release
pub fn is_latest(game_mod: &GameMod, version: &ModVersion) -> bool {
    version >= &game_mod.latest().version
}
