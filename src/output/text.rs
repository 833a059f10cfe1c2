//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Pass/fail lines with colors
//! - Blueprint content summaries (entity counts, buildings per prototype)
//! - Compatibility ranges with the latest-version marker
//! - Directory check summaries

use crate::checker::CheckSummary;
use crate::compat::CompatReport;
use crate::domain::{BetaBlueprint, DecodedBlueprint, Diagnostic, ParseResult};
use crate::output::{DecodeReport, OutputFormatter, Verbosity};
use colored::Colorize;
use std::io::Write;

/// Text formatter for human-readable output
pub struct TextFormatter {
    verbosity: Verbosity,
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self::with_color(verbosity, true)
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, color: bool) -> Self {
        Self { verbosity, color }
    }

    fn pass_mark(&self) -> String {
        if self.color {
            "✓".green().bold().to_string()
        } else {
            "✓".to_string()
        }
    }

    fn fail_mark(&self) -> String {
        if self.color {
            "✗".red().bold().to_string()
        } else {
            "✗".to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    fn emphasis(&self, text: &str) -> String {
        if self.color {
            text.bright_white().bold().to_string()
        } else {
            text.to_string()
        }
    }

    /// One-line description of a decoded payload
    fn describe(&self, decoded: &DecodedBlueprint) -> String {
        match decoded {
            DecodedBlueprint::PassThrough => "accepted (no grammar registered)".to_string(),
            DecodedBlueprint::MultiBuildBeta(blueprint) => format!(
                "{} buildings, {} belts, {} inserters",
                blueprint.buildings.len(),
                blueprint.belt_count,
                blueprint.inserter_count
            ),
        }
    }

    fn write_blueprint_details(
        &self,
        blueprint: &BetaBlueprint,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if let Some(name) = &blueprint.name {
            writeln!(writer, "  {} {}", self.dim("name:"), name)?;
        }
        writeln!(
            writer,
            "  {} {}",
            self.dim("format version:"),
            blueprint.format_version
        )?;
        for (proto_id, count) in &blueprint.building_counts {
            writeln!(writer, "  {} {} x{}", self.dim("proto"), proto_id, count)?;
        }
        Ok(())
    }

    fn write_failure(&self, diagnostic: &Diagnostic, writer: &mut dyn Write) -> std::io::Result<()> {
        writeln!(
            writer,
            "{} {}",
            self.fail_mark(),
            diagnostic.validation_message()
        )?;
        writeln!(writer, "  {}", self.dim(&diagnostic.detail))
    }
}

impl OutputFormatter for TextFormatter {
    fn format_decode(&self, report: &DecodeReport, writer: &mut dyn Write) -> std::io::Result<()> {
        match &report.result {
            ParseResult::Success(decoded) => {
                if self.verbosity == Verbosity::Quiet {
                    return Ok(());
                }
                writeln!(
                    writer,
                    "{} {} - {}: {}",
                    self.pass_mark(),
                    self.emphasis(&report.mod_name),
                    report.mod_version,
                    self.describe(decoded)
                )?;
                if self.verbosity == Verbosity::Verbose {
                    writeln!(writer, "  {} {}", self.dim("source:"), report.source)?;
                    if let DecodedBlueprint::MultiBuildBeta(blueprint) = decoded {
                        self.write_blueprint_details(blueprint, writer)?;
                    }
                }
                Ok(())
            }
            ParseResult::Failure(diagnostic) => self.write_failure(diagnostic, writer),
        }
    }

    fn format_compat(&self, report: &CompatReport, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.verbosity == Verbosity::Quiet {
            return writeln!(writer, "{}", report.range);
        }

        writeln!(
            writer,
            "{} - {}",
            self.emphasis(&report.mod_name),
            report.version
        )?;

        let legacy = if report.legacy_merged {
            format!(" {}", self.dim("(legacy merge)"))
        } else {
            String::new()
        };
        writeln!(writer, "  compatible: {}{}", report.range, legacy)?;

        let status = match (report.is_latest, self.color) {
            (true, true) => "up to date".green().to_string(),
            (true, false) => "up to date".to_string(),
            (false, true) => "outdated".yellow().to_string(),
            (false, false) => "outdated".to_string(),
        };
        writeln!(writer, "  latest: {} [{}]", report.latest, status)?;

        if self.verbosity == Verbosity::Verbose {
            writeln!(
                writer,
                "  {} {}",
                self.dim("latest updated:"),
                report.latest_updated_at.format("%Y/%m/%d %H:%M")
            )?;
        }
        Ok(())
    }

    fn format_check(&self, summary: &CheckSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        let width = summary
            .files
            .iter()
            .map(|f| f.path.display().to_string().len())
            .max()
            .unwrap_or(0);

        for file in &summary.files {
            let path = format!("{:width$}", file.path.display(), width = width);
            match &file.result {
                ParseResult::Success(decoded) => {
                    if self.verbosity == Verbosity::Quiet {
                        continue;
                    }
                    writeln!(
                        writer,
                        "{} {} {}",
                        self.pass_mark(),
                        path,
                        self.dim(&self.describe(decoded))
                    )?;
                }
                ParseResult::Failure(diagnostic) => {
                    writeln!(writer, "{} {} {}", self.fail_mark(), path, diagnostic.detail)?;
                }
            }
        }

        for error in &summary.errors {
            writeln!(
                writer,
                "{} {} {}",
                self.fail_mark(),
                error.path.display(),
                error.message
            )?;
        }

        if self.verbosity != Verbosity::Quiet {
            if !summary.files.is_empty() || !summary.errors.is_empty() {
                writeln!(writer)?;
            }
            writeln!(
                writer,
                "Checked {} blueprint(s) for {} - {}: {} passed, {} failed",
                summary.total(),
                summary.mod_name,
                summary.mod_version,
                summary.passed(),
                summary.failed() + summary.errors.len()
            )?;
        }
        Ok(())
    }
}
