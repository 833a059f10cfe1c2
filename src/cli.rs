//! CLI argument parsing module for bpcheck

use crate::domain::ModVersion;
use crate::error::ConfigError;
use crate::grammar::UnknownModPolicy;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Parse a mod version argument
fn parse_mod_version(s: &str) -> Result<ModVersion, String> {
    ModVersion::parse(s).map_err(|e| e.to_string())
}

/// Blueprint encoding checker and mod compatibility resolver
#[derive(Parser, Debug, Clone)]
#[command(
    name = "bpcheck",
    version,
    about = "Blueprint encoding checker and mod compatibility resolver"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    // Output options
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output and debug logging
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Enable quiet mode - only report failures
    #[arg(short, long, global = true)]
    pub quiet: bool,

    // Decoder options
    /// Reject blueprints for mods without a registered grammar
    #[arg(long, global = true)]
    pub strict: bool,
}

/// Mod a blueprint was submitted for
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ModArgs {
    /// Mod name, e.g. MultiBuildBeta
    #[arg(long = "mod", value_name = "NAME")]
    pub mod_name: String,

    /// Mod version, e.g. 2.0.6
    #[arg(long = "mod-version", value_name = "VERSION", value_parser = parse_mod_version)]
    pub mod_version: ModVersion,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Decode a single encoded blueprint
    Decode {
        #[command(flatten)]
        target: ModArgs,

        /// File holding the encoded blueprint (stdin when omitted or "-")
        file: Option<PathBuf>,
    },

    /// Resolve the compatibility range of a mod version
    Compat {
        /// Mod catalog TOML file
        #[arg(long, value_name = "FILE")]
        catalog: PathBuf,

        #[command(flatten)]
        target: ModArgs,
    },

    /// Decode every *.txt / *.blueprint file in a directory
    Check {
        /// Directory holding encoded blueprint files
        dir: PathBuf,

        #[command(flatten)]
        target: ModArgs,

        /// Maximum number of files decoded at once
        #[arg(long, default_value_t = 8)]
        concurrency: usize,
    },
}

impl Command {
    /// Mod arguments shared by every subcommand
    pub fn target(&self) -> &ModArgs {
        match self {
            Command::Decode { target, .. }
            | Command::Compat { target, .. }
            | Command::Check { target, .. } => target,
        }
    }
}

impl CliArgs {
    /// Policy for mods without a grammar
    pub fn unknown_mod_policy(&self) -> UnknownModPolicy {
        if self.strict {
            UnknownModPolicy::Reject
        } else {
            UnknownModPolicy::Permissive
        }
    }

    /// Whether to draw progress bars
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.json
    }

    /// Check paths and values clap cannot validate on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.command {
            Command::Decode { file, .. } => match file.as_deref() {
                Some(path) if !is_stdin(Some(path)) && !path.is_file() => {
                    Err(ConfigError::invalid_path(path, "not a readable file"))
                }
                _ => Ok(()),
            },
            Command::Compat { catalog, .. } => {
                if catalog.is_file() {
                    Ok(())
                } else {
                    Err(ConfigError::invalid_path(catalog, "mod catalog not found"))
                }
            }
            Command::Check {
                dir, concurrency, ..
            } => {
                if *concurrency == 0 {
                    return Err(ConfigError::InvalidValue {
                        name: "concurrency",
                        message: "must be at least 1".to_string(),
                    });
                }
                if dir.exists() && !dir.is_dir() {
                    return Err(ConfigError::invalid_path(dir, "not a directory"));
                }
                Ok(())
            }
        }
    }

    /// Default tracing filter when RUST_LOG is not set
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "bpcheck=debug"
        } else if self.quiet {
            "bpcheck=error"
        } else {
            "bpcheck=warn"
        }
    }
}

/// Returns true if `path` means standard input
pub fn is_stdin(path: Option<&Path>) -> bool {
    path.map_or(true, |p| p == Path::new("-"))
}
