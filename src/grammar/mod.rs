//! Blueprint grammars and the registry that dispatches to them
//!
//! This module provides:
//! - The `GrammarHandler` trait every mod-specific decoder implements
//! - A registry keyed by mod name
//! - The named policy applied to mods without a grammar
//! - Resource limits applied to every decode

mod multibuild_beta;

pub use multibuild_beta::MultiBuildBetaGrammar;

use crate::domain::{DecodedBlueprint, Diagnostic, ModVersion, ParseResult};
use crate::error::DecodeError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Default maximum length of an encoded blueprint (8 MiB)
pub const DEFAULT_MAX_ENCODED_LEN: usize = 8 * 1024 * 1024;

/// Default maximum size of a decompressed payload (64 MiB)
pub const DEFAULT_MAX_DECOMPRESSED_LEN: usize = 64 * 1024 * 1024;

/// Default maximum number of entities in one blueprint
pub const DEFAULT_MAX_ENTITIES: usize = 100_000;

/// Resource limits applied while decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum length of the encoded string in bytes
    pub max_encoded_len: usize,
    /// Maximum size of decompressed data in bytes
    pub max_decompressed_len: usize,
    /// Maximum number of entities
    pub max_entities: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_encoded_len: DEFAULT_MAX_ENCODED_LEN,
            max_decompressed_len: DEFAULT_MAX_DECOMPRESSED_LEN,
            max_entities: DEFAULT_MAX_ENTITIES,
        }
    }
}

/// Range of mod versions a grammar implements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionBounds {
    /// Inclusive lower bound
    pub min: Option<ModVersion>,
    /// Exclusive upper bound
    pub below: Option<ModVersion>,
}

impl VersionBounds {
    /// Bounds accepting every version
    pub fn any() -> Self {
        Self::default()
    }

    /// Bounds accepting versions at or above `min`
    pub fn at_least(min: ModVersion) -> Self {
        Self {
            min: Some(min),
            below: None,
        }
    }

    /// Sets the exclusive upper bound
    pub fn below(mut self, below: ModVersion) -> Self {
        self.below = Some(below);
        self
    }

    /// Returns true if the version lies within the bounds
    pub fn contains(&self, version: &ModVersion) -> bool {
        let above_min = self.min.as_ref().map_or(true, |min| version >= min);
        let under_max = self.below.as_ref().map_or(true, |below| version < below);
        above_min && under_max
    }
}

/// Decoder for one mod's blueprint encoding
pub trait GrammarHandler: Send + Sync {
    /// Mod name this grammar is registered under
    fn mod_name(&self) -> &str;

    /// Mod versions this grammar implements
    fn supported_versions(&self) -> VersionBounds {
        VersionBounds::any()
    }

    /// Decode an encoded blueprint
    fn decode(
        &self,
        encoded: &str,
        version: &ModVersion,
        limits: &DecodeLimits,
    ) -> Result<DecodedBlueprint, DecodeError>;
}

/// What to do with blueprints for mods that have no grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownModPolicy {
    /// Accept the blueprint without inspecting it
    #[default]
    Permissive,
    /// Reject the blueprint as `UnknownMod`
    Reject,
}

/// Registry mapping mod names to grammars
#[derive(Clone)]
pub struct GrammarRegistry {
    handlers: HashMap<String, Arc<dyn GrammarHandler>>,
    unknown_mod_policy: UnknownModPolicy,
    limits: DecodeLimits,
}

impl GrammarRegistry {
    /// Create an empty registry with the permissive policy
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            unknown_mod_policy: UnknownModPolicy::default(),
            limits: DecodeLimits::default(),
        }
    }

    /// Create a registry with every built-in grammar
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(MultiBuildBetaGrammar::new());
        registry
    }

    /// Set the unknown mod policy
    pub fn with_policy(mut self, policy: UnknownModPolicy) -> Self {
        self.unknown_mod_policy = policy;
        self
    }

    /// Set the decode limits
    pub fn with_limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Register a grammar, returning the one it replaced
    pub fn register<H>(&mut self, handler: H) -> Option<Arc<dyn GrammarHandler>>
    where
        H: GrammarHandler + 'static,
    {
        let handler: Arc<dyn GrammarHandler> = Arc::new(handler);
        self.handlers
            .insert(handler.mod_name().to_string(), handler)
    }

    /// Get the grammar for a mod
    pub fn handler_for(&self, mod_name: &str) -> Option<&Arc<dyn GrammarHandler>> {
        self.handlers.get(mod_name)
    }

    /// Registered mod names, sorted
    pub fn mod_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Current unknown mod policy
    pub fn policy(&self) -> UnknownModPolicy {
        self.unknown_mod_policy
    }

    /// Current decode limits
    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    /// Decode and return a typed error on failure
    pub fn try_decode(
        &self,
        encoded: &str,
        mod_name: &str,
        version: &ModVersion,
    ) -> Result<DecodedBlueprint, DecodeError> {
        if encoded.trim().is_empty() {
            return Err(DecodeError::malformed("encoded blueprint is empty"));
        }

        let Some(handler) = self.handlers.get(mod_name) else {
            return match self.unknown_mod_policy {
                UnknownModPolicy::Permissive => {
                    tracing::debug!(mod_name, "no grammar registered, accepting blueprint as-is");
                    Ok(DecodedBlueprint::PassThrough)
                }
                UnknownModPolicy::Reject => Err(DecodeError::unknown_mod(mod_name)),
            };
        };

        if !handler.supported_versions().contains(version) {
            return Err(DecodeError::unsupported(mod_name, version));
        }

        handler.decode(encoded, version, &self.limits)
    }

    /// Decode into a `ParseResult`
    pub fn decode(&self, encoded: &str, mod_name: &str, version: &ModVersion) -> ParseResult {
        match self.try_decode(encoded, mod_name, version) {
            Ok(decoded) => ParseResult::Success(decoded),
            Err(err) => ParseResult::Failure(Diagnostic::from_error(mod_name, version, &err)),
        }
    }
}

impl Default for GrammarRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for GrammarRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrammarRegistry")
            .field("mods", &self.mod_names())
            .field("unknown_mod_policy", &self.unknown_mod_policy)
            .field("limits", &self.limits)
            .finish()
    }
}
