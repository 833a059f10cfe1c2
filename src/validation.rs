//! Blueprint validation before a write is committed
//!
//! Runs the presence checks and the synchronous decode. Decoder failures are
//! attached to the `encoded_blueprint` field with the mod/version label.

use crate::domain::{BlueprintField, DecodedBlueprint, ModVersion};
use crate::grammar::GrammarRegistry;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

const BLANK: &str = "can't be blank";
const BAD_VERSION: &str = "Unregistered mod or version format.";

/// Blueprint attributes as submitted by a user
#[derive(Debug, Clone, Copy)]
pub struct BlueprintDraft<'a> {
    pub title: &'a str,
    pub encoded_blueprint: &'a str,
    pub mod_name: &'a str,
    pub mod_version: &'a str,
}

/// A draft that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBlueprint {
    pub mod_version: ModVersion,
    pub decoded: DecodedBlueprint,
}

/// Field-level validation errors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    errors: BTreeMap<BlueprintField, Vec<String>>,
}

impl FieldErrors {
    /// Create an empty error collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a message to a field
    pub fn add(&mut self, field: BlueprintField, message: impl Into<String>) {
        self.errors.entry(field).or_default().push(message.into());
    }

    /// Returns true if no errors were recorded
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Messages recorded for a field
    pub fn get(&self, field: BlueprintField) -> &[String] {
        self.errors.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Messages prefixed with the field name
    pub fn full_messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .flat_map(|(field, messages)| {
                messages
                    .iter()
                    .map(move |message| format!("{} {}", field.human_name(), message))
            })
            .collect()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_messages().join("; "))
    }
}

impl std::error::Error for FieldErrors {}

/// Validate a draft, decoding the encoded blueprint with the registry
pub fn validate(
    draft: &BlueprintDraft<'_>,
    registry: &GrammarRegistry,
) -> Result<ValidatedBlueprint, FieldErrors> {
    let mut errors = FieldErrors::new();

    if draft.title.trim().is_empty() {
        errors.add(BlueprintField::Title, BLANK);
    }
    if draft.mod_name.trim().is_empty() {
        errors.add(BlueprintField::ModName, BLANK);
    }

    let encoded_present = !draft.encoded_blueprint.trim().is_empty();
    if !encoded_present {
        errors.add(BlueprintField::EncodedBlueprint, BLANK);
    }

    let version = match ModVersion::parse(draft.mod_version) {
        Ok(version) => Some(version),
        Err(_) => {
            errors.add(BlueprintField::ModVersion, BAD_VERSION);
            None
        }
    };

    let mut decoded = None;
    if let (true, Some(version)) = (encoded_present, version.as_ref()) {
        let result = registry.decode(draft.encoded_blueprint, draft.mod_name, version);
        match result.diagnostic() {
            Some(diagnostic) => {
                tracing::debug!(%diagnostic, "blueprint failed validation");
                errors.add(
                    BlueprintField::EncodedBlueprint,
                    diagnostic.validation_message(),
                );
            }
            None => decoded = result.decoded().cloned(),
        }
    }

    match (errors.is_empty(), version, decoded) {
        (true, Some(mod_version), Some(decoded)) => Ok(ValidatedBlueprint {
            mod_version,
            decoded,
        }),
        _ => Err(errors),
    }
}
