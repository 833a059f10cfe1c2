//! Core domain models for bpcheck
//!
//! This module contains the fundamental types used throughout the crate:
//! - Mod versions with semantic ordering and `"<mod> - <version>"` labels
//! - Mods with their release history and latest pointer
//! - Compatibility ranges
//! - Decoder results and diagnostics
//! - Blueprint records, commits and parsed data

mod blueprint;
mod compatibility;
mod game_mod;
mod mod_version;
mod parse_result;

pub use blueprint::{
    BlueprintField, BlueprintId, BlueprintRecord, Commit, ParsedBlueprintData, ParsedOutcome,
};
pub use compatibility::CompatibilityRange;
pub use game_mod::{GameMod, LatestPointer, ModRelease};
pub use mod_version::{formatted_mod_version, ModLabel, ModVersion};
pub use parse_result::{
    BetaBlueprint, BuildingEntry, DecodedBlueprint, Diagnostic, DiagnosticKind, ParseResult,
    Position,
};
