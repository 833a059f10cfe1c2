//! bpcheck - Blueprint encoding checker CLI tool
//!
//! Subcommands:
//! - decode: validate one encoded blueprint against its mod grammar
//! - compat: resolve the compatibility range of a mod version from a catalog
//! - check: validate every blueprint file in a directory

use anyhow::Context;
use bpcheck::catalog::ModCatalog;
use bpcheck::checker::Checker;
use bpcheck::cli::{is_stdin, CliArgs, Command};
use bpcheck::compat::CompatibilityResolver;
use bpcheck::error::IoError;
use bpcheck::grammar::GrammarRegistry;
use bpcheck::output::{create_formatter, DecodeReport, OutputConfig};
use clap::Parser;
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Exit code when at least one blueprint failed to decode
const EXIT_BLUEPRINT_FAILED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    // Run the main logic and handle errors
    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    args.validate()?;

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), command = ?args.command, "starting");

    let registry = GrammarRegistry::with_defaults().with_policy(args.unknown_mod_policy());
    let output_config = OutputConfig::from_cli(
        args.json,
        args.verbose,
        args.quiet,
        io::stdout().is_terminal(),
    );
    let formatter = create_formatter(output_config);
    let mut stdout = io::stdout().lock();

    let failed = match &args.command {
        Command::Decode { target, file } => {
            let (source, encoded) = read_encoded(file.as_deref())?;
            let result = registry.decode(&encoded, &target.mod_name, &target.mod_version);
            let failed = !result.is_success();
            let report = DecodeReport {
                source,
                mod_name: target.mod_name.clone(),
                mod_version: target.mod_version.clone(),
                result,
            };
            formatter.format_decode(&report, &mut stdout)?;
            failed
        }
        Command::Compat { catalog, target } => {
            let catalog = ModCatalog::from_path(catalog)?;
            let game_mod = catalog.get(&target.mod_name)?;
            let report = CompatibilityResolver::new()
                .report(&game_mod, &target.mod_version)
                .with_context(|| format!("cannot resolve {}", target.mod_name))?;
            formatter.format_compat(&report, &mut stdout)?;
            false
        }
        Command::Check {
            dir,
            target,
            concurrency,
        } => {
            let checker = Checker::with_concurrency(Arc::new(registry), *concurrency);
            let summary = checker
                .check_dir(dir, &target.mod_name, &target.mod_version, args.show_progress())
                .await?;
            formatter.format_check(&summary, &mut stdout)?;
            summary.has_failures()
        }
    };
    stdout.flush()?;

    if failed {
        Ok(ExitCode::from(EXIT_BLUEPRINT_FAILED))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Read the encoded blueprint from a file or stdin
fn read_encoded(file: Option<&std::path::Path>) -> Result<(String, String), IoError> {
    match file {
        Some(path) if !is_stdin(Some(path)) => {
            let encoded =
                std::fs::read_to_string(path).map_err(|e| IoError::generic(path, e))?;
            Ok((path.display().to_string(), encoded))
        }
        _ => {
            let encoded =
                io::read_to_string(io::stdin()).map_err(|e| IoError::generic("<stdin>", e))?;
            Ok(("<stdin>".to_string(), encoded))
        }
    }
}
