//! Mod catalog loaded from TOML
//!
//! The catalog holds one `GameMod` per mod name. Readers receive an
//! `Arc<GameMod>` snapshot; publishing a release swaps in a new `Arc`, so a
//! snapshot taken earlier never changes underneath its holder.
//!
//! File format:
//!
//! ```toml
//! [[mods]]
//! name = "MultiBuildBeta"
//! latest = "2.1.0"
//! latest_updated_at = "2021-05-01T00:00:00Z"
//!
//! [[mods.releases]]
//! version = "2.0.0"
//! breaking = true
//! released_at = "2021-03-01T00:00:00Z"
//! ```

use crate::domain::{GameMod, LatestPointer, ModRelease, ModVersion};
use crate::error::{CatalogError, VersionError};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    mods: Vec<RawMod>,
}

#[derive(Debug, Deserialize)]
struct RawMod {
    name: String,
    latest: Option<String>,
    latest_updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    releases: Vec<RawRelease>,
}

#[derive(Debug, Deserialize)]
struct RawRelease {
    version: String,
    #[serde(default)]
    breaking: bool,
    released_at: Option<DateTime<Utc>>,
}

impl RawMod {
    fn into_game_mod(self) -> Result<GameMod, CatalogError> {
        let name = self.name;
        let invalid = |source: VersionError| CatalogError::InvalidEntry {
            mod_name: name.clone(),
            source,
        };

        let releases = self
            .releases
            .into_iter()
            .map(|raw| {
                let version = ModVersion::parse(&raw.version)?;
                Ok(ModRelease {
                    version,
                    breaking: raw.breaking,
                    released_at: raw.released_at,
                })
            })
            .collect::<Result<Vec<_>, VersionError>>()
            .map_err(invalid)?;

        let game_mod = match self.latest {
            Some(latest) => {
                let version = ModVersion::parse(&latest).map_err(invalid)?;
                let updated_at = self
                    .latest_updated_at
                    .or_else(|| {
                        releases
                            .iter()
                            .find(|r| r.version == version)
                            .and_then(|r| r.released_at)
                    })
                    .unwrap_or_else(Utc::now);
                GameMod::new(name.clone(), releases, LatestPointer { version, updated_at })
            }
            None => GameMod::with_releases(name.clone(), releases),
        };

        game_mod.map_err(invalid)
    }
}

/// Mod metadata keyed by mod name
#[derive(Debug, Default)]
pub struct ModCatalog {
    mods: RwLock<HashMap<String, Arc<GameMod>>>,
}

impl ModCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from TOML content
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = toml::from_str(content)
            .map_err(|e: toml::de::Error| CatalogError::toml_parse_error(e.to_string()))?;

        let mut mods = HashMap::with_capacity(raw.mods.len());
        for raw_mod in raw.mods {
            let game_mod = raw_mod.into_game_mod()?;
            let name = game_mod.name().to_string();
            if mods.contains_key(&name) {
                return Err(CatalogError::DuplicateMod { mod_name: name });
            }
            mods.insert(name, Arc::new(game_mod));
        }

        tracing::debug!(mods = mods.len(), "loaded mod catalog");
        Ok(Self {
            mods: RwLock::new(mods),
        })
    }

    /// Read and parse a catalog file
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CatalogError::read_error(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Add or replace a mod
    pub fn insert(&self, game_mod: GameMod) -> Option<Arc<GameMod>> {
        let mut mods = self.mods.write().unwrap_or_else(PoisonError::into_inner);
        mods.insert(game_mod.name().to_string(), Arc::new(game_mod))
    }

    /// Snapshot of a mod
    pub fn get(&self, mod_name: &str) -> Result<Arc<GameMod>, CatalogError> {
        let mods = self.mods.read().unwrap_or_else(PoisonError::into_inner);
        mods.get(mod_name)
            .cloned()
            .ok_or_else(|| CatalogError::mod_not_found(mod_name))
    }

    /// Mod names, sorted
    pub fn mod_names(&self) -> Vec<String> {
        let mods = self.mods.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = mods.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of mods
    pub fn len(&self) -> usize {
        self.mods.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if the catalog has no mods
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Publish a release, moving the latest pointer when it is newer
    ///
    /// Returns false if the release was already known.
    pub fn publish(
        &self,
        mod_name: &str,
        release: ModRelease,
        at: DateTime<Utc>,
    ) -> Result<bool, CatalogError> {
        let mut mods = self.mods.write().unwrap_or_else(PoisonError::into_inner);
        let current = mods
            .get(mod_name)
            .ok_or_else(|| CatalogError::mod_not_found(mod_name))?;

        let mut updated = GameMod::clone(current);
        let version = release.version.clone();
        if !updated.publish(release, at) {
            return Ok(false);
        }

        tracing::info!(
            mod_name,
            %version,
            latest = %updated.latest().version,
            "published mod release"
        );
        mods.insert(mod_name.to_string(), Arc::new(updated));
        Ok(true)
    }
}
