//! Compatibility range type

use super::ModVersion;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive span of mod versions considered compatible
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityRange {
    /// Lowest compatible version
    pub lower: ModVersion,
    /// Highest compatible version
    pub upper: ModVersion,
}

impl CompatibilityRange {
    /// Creates a new range
    pub fn new(lower: ModVersion, upper: ModVersion) -> Self {
        Self { lower, upper }
    }

    /// Returns true if `version` lies within the range
    pub fn contains(&self, version: &ModVersion) -> bool {
        &self.lower <= version && version <= &self.upper
    }

    /// Returns true if the range covers a single version
    pub fn is_single(&self) -> bool {
        self.lower == self.upper
    }
}

impl fmt::Display for CompatibilityRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.lower)
        } else {
            write!(f, "{} - {}", self.lower, self.upper)
        }
    }
}
