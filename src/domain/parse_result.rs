//! Decoder output types

use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 2D position relative to the blueprint cursor
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A building extracted from a MultiBuildBeta blueprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingEntry {
    /// Id of the building in the copied selection
    pub id: i64,
    /// Game item prototype id
    pub proto_id: u32,
    /// Model variant
    pub model_index: u32,
    /// Position relative to the cursor
    pub position: Position,
    /// Rotation in degrees
    pub yaw: f64,
}

/// Structured content of a MultiBuildBeta blueprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetaBlueprint {
    /// Payload format version
    pub format_version: u32,
    /// Optional label stored in the payload
    pub name: Option<String>,
    /// Reference position of the selection
    pub reference_pos: Position,
    /// Buildings ordered by id
    pub buildings: Vec<BuildingEntry>,
    /// Number of belt segments
    pub belt_count: usize,
    /// Number of inserters
    pub inserter_count: usize,
    /// Building count per prototype id
    pub building_counts: BTreeMap<u32, usize>,
}

impl BetaBlueprint {
    /// Total number of copied entities
    pub fn entity_count(&self) -> usize {
        self.buildings.len() + self.belt_count + self.inserter_count
    }
}

/// Format-specific payload of a successful decode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum DecodedBlueprint {
    /// No grammar inspected the blueprint
    PassThrough,
    /// Decoded MultiBuildBeta payload
    MultiBuildBeta(BetaBlueprint),
}

impl DecodedBlueprint {
    /// Returns true for the pass-through payload
    pub fn is_pass_through(&self) -> bool {
        matches!(self, DecodedBlueprint::PassThrough)
    }

    /// Short name of the payload format
    pub fn format_name(&self) -> &'static str {
        match self {
            DecodedBlueprint::PassThrough => "pass-through",
            DecodedBlueprint::MultiBuildBeta(_) => "MultiBuildBeta",
        }
    }
}

/// Category of a decode failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    MalformedEncoding,
    UnsupportedModVersion,
    UnknownMod,
    Timeout,
}

impl From<&DecodeError> for DiagnosticKind {
    fn from(err: &DecodeError) -> Self {
        match err {
            DecodeError::MalformedEncoding { .. } => DiagnosticKind::MalformedEncoding,
            DecodeError::UnsupportedModVersion { .. } => DiagnosticKind::UnsupportedModVersion,
            DecodeError::UnknownMod { .. } => DiagnosticKind::UnknownMod,
            DecodeError::Timeout { .. } => DiagnosticKind::Timeout,
        }
    }
}

/// Human-readable description of a decode failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Mod the blueprint was submitted for
    pub mod_name: String,
    /// Mod version the blueprint was submitted for
    pub mod_version: String,
    /// Failure category
    pub kind: DiagnosticKind,
    /// What went wrong
    pub detail: String,
}

impl Diagnostic {
    /// Builds a diagnostic from a decode error
    pub fn from_error(mod_name: &str, mod_version: impl ToString, err: &DecodeError) -> Self {
        Self {
            mod_name: mod_name.to_string(),
            mod_version: mod_version.to_string(),
            kind: DiagnosticKind::from(err),
            detail: err.to_string(),
        }
    }

    /// Message attached to the encoded blueprint field on validation failure
    pub fn validation_message(&self) -> String {
        format!(
            "Wrong blueprint format for mod version: {} - {}",
            self.mod_name, self.mod_version
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.validation_message(), self.detail)
    }
}

/// Outcome of decoding an encoded blueprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum ParseResult {
    Success(DecodedBlueprint),
    Failure(Diagnostic),
}

impl ParseResult {
    /// Returns true on success
    pub fn is_success(&self) -> bool {
        matches!(self, ParseResult::Success(_))
    }

    /// Returns the decoded payload on success
    pub fn decoded(&self) -> Option<&DecodedBlueprint> {
        match self {
            ParseResult::Success(decoded) => Some(decoded),
            ParseResult::Failure(_) => None,
        }
    }

    /// Returns the diagnostic on failure
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            ParseResult::Success(_) => None,
            ParseResult::Failure(diagnostic) => Some(diagnostic),
        }
    }
}
