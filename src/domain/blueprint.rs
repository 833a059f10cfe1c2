//! Blueprint records as seen by the persistence layer

use super::{formatted_mod_version, DecodedBlueprint, Diagnostic, ModVersion, ParseResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a stored blueprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlueprintId(pub u64);

impl fmt::Display for BlueprintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted blueprint fields relevant to decoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueprintRecord {
    pub id: BlueprintId,
    pub title: String,
    pub encoded_blueprint: String,
    pub mod_name: String,
    pub mod_version: ModVersion,
    /// Incremented on every commit
    pub revision: u64,
}

impl BlueprintRecord {
    /// `"<mod> - <version>"` label
    pub fn formatted_mod_version(&self) -> String {
        formatted_mod_version(&self.mod_name, &self.mod_version)
    }
}

/// Blueprint attributes tracked for change detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlueprintField {
    Title,
    EncodedBlueprint,
    ModName,
    ModVersion,
}

impl BlueprintField {
    /// Field name as exposed to the web layer
    pub fn as_str(&self) -> &'static str {
        match self {
            BlueprintField::Title => "title",
            BlueprintField::EncodedBlueprint => "encoded_blueprint",
            BlueprintField::ModName => "mod_name",
            BlueprintField::ModVersion => "mod_version",
        }
    }

    /// Human-readable field name used in full error messages
    pub fn human_name(&self) -> &'static str {
        match self {
            BlueprintField::Title => "Title",
            BlueprintField::EncodedBlueprint => "Encoded blueprint",
            BlueprintField::ModName => "Mod",
            BlueprintField::ModVersion => "Mod version",
        }
    }
}

impl fmt::Display for BlueprintField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed write and the fields it changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub id: BlueprintId,
    pub revision: u64,
    pub changed: Vec<BlueprintField>,
}

impl Commit {
    /// Computes the changed fields between the previous and the new record
    pub fn between(before: Option<&BlueprintRecord>, after: &BlueprintRecord) -> Self {
        let changed = match before {
            None => vec![
                BlueprintField::Title,
                BlueprintField::EncodedBlueprint,
                BlueprintField::ModName,
                BlueprintField::ModVersion,
            ],
            Some(before) => {
                let mut changed = Vec::new();
                if before.title != after.title {
                    changed.push(BlueprintField::Title);
                }
                if before.encoded_blueprint != after.encoded_blueprint {
                    changed.push(BlueprintField::EncodedBlueprint);
                }
                if before.mod_name != after.mod_name {
                    changed.push(BlueprintField::ModName);
                }
                if before.mod_version != after.mod_version {
                    changed.push(BlueprintField::ModVersion);
                }
                changed
            }
        };

        Self {
            id: after.id,
            revision: after.revision,
            changed,
        }
    }

    /// Returns true if the commit touched the given field
    pub fn saved_change_to(&self, field: BlueprintField) -> bool {
        self.changed.contains(&field)
    }
}

/// Derived outcome stored next to the raw encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "data", rename_all = "snake_case")]
pub enum ParsedOutcome {
    Decoded(DecodedBlueprint),
    Failed(Diagnostic),
}

impl From<ParseResult> for ParsedOutcome {
    fn from(result: ParseResult) -> Self {
        match result {
            ParseResult::Success(decoded) => ParsedOutcome::Decoded(decoded),
            ParseResult::Failure(diagnostic) => ParsedOutcome::Failed(diagnostic),
        }
    }
}

/// Parsed data written by the post-commit parse job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedBlueprintData {
    pub blueprint_id: BlueprintId,
    /// Revision of the encoding this data was derived from
    pub revision: u64,
    pub outcome: ParsedOutcome,
    pub parsed_at: DateTime<Utc>,
}

impl ParsedBlueprintData {
    /// Returns the diagnostic when the parse failed
    pub fn failure(&self) -> Option<&Diagnostic> {
        match &self.outcome {
            ParsedOutcome::Failed(diagnostic) => Some(diagnostic),
            ParsedOutcome::Decoded(_) => None,
        }
    }
}
