//! JSON output formatter for machine processing
//!
//! This module provides:
//! - JSON serialization of decode and compatibility results
//! - A check document with summary counts and per-file results

use crate::checker::{CheckError, CheckSummary, FileReport};
use crate::compat::CompatReport;
use crate::output::{DecodeReport, OutputFormatter, Verbosity};
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Quiet mode drops passing files from check output
    verbosity: Verbosity,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    fn write_json<T: Serialize>(&self, value: &T, writer: &mut dyn Write) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(writer, "{}", json)
    }
}

/// JSON representation of a directory check
#[derive(Serialize)]
struct JsonCheck<'a> {
    mod_name: &'a str,
    mod_version: &'a str,
    summary: JsonCheckCounts,
    files: Vec<&'a FileReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<CheckError>,
}

/// JSON representation of check counts
#[derive(Serialize)]
struct JsonCheckCounts {
    total: usize,
    passed: usize,
    failed: usize,
}

impl OutputFormatter for JsonFormatter {
    fn format_decode(&self, report: &DecodeReport, writer: &mut dyn Write) -> std::io::Result<()> {
        self.write_json(report, writer)
    }

    fn format_compat(&self, report: &CompatReport, writer: &mut dyn Write) -> std::io::Result<()> {
        self.write_json(report, writer)
    }

    fn format_check(&self, summary: &CheckSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        let files = summary
            .files
            .iter()
            .filter(|f| self.verbosity != Verbosity::Quiet || !f.result.is_success())
            .collect();

        let output = JsonCheck {
            mod_name: &summary.mod_name,
            mod_version: &summary.mod_version,
            summary: JsonCheckCounts {
                total: summary.total(),
                passed: summary.passed(),
                failed: summary.failed(),
            },
            files,
            errors: summary.errors.clone(),
        };
        self.write_json(&output, writer)
    }
}
