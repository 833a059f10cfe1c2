//! Batch checking of encoded blueprint files
//!
//! This module provides:
//! - Detection of `*.txt` / `*.blueprint` files in a directory
//! - Parallel decoding bounded by a semaphore
//! - Per-file results collected into a `CheckSummary`

use crate::domain::{ModVersion, ParseResult};
use crate::error::IoError;
use crate::grammar::GrammarRegistry;
use crate::progress::Progress;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};

/// File extensions treated as encoded blueprints
pub const BLUEPRINT_EXTENSIONS: &[&str] = &["txt", "blueprint"];

/// Default number of files decoded at once
const DEFAULT_CONCURRENCY: usize = 8;

/// Decode result for one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub result: ParseResult,
}

/// A file that could not be checked at all
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckError {
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of checking a directory
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckSummary {
    pub mod_name: String,
    pub mod_version: String,
    /// Reports sorted by path
    pub files: Vec<FileReport>,
    pub errors: Vec<CheckError>,
}

impl CheckSummary {
    /// Number of files checked
    pub fn total(&self) -> usize {
        self.files.len()
    }

    /// Number of files that decoded
    pub fn passed(&self) -> usize {
        self.files.iter().filter(|f| f.result.is_success()).count()
    }

    /// Number of files that failed to decode
    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    /// Returns true if any file failed or could not be read
    pub fn has_failures(&self) -> bool {
        self.failed() > 0 || !self.errors.is_empty()
    }
}

/// List blueprint files directly inside `dir`, sorted by path
pub fn detect_blueprints(dir: &Path) -> Result<Vec<PathBuf>, IoError> {
    if !dir.is_dir() {
        return Err(IoError::directory_not_found(dir));
    }

    let entries = std::fs::read_dir(dir).map_err(|e| IoError::generic(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| IoError::generic(dir, e))?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| BLUEPRINT_EXTENSIONS.contains(&ext));
        if matches && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Checks directories of blueprint files against one mod version
pub struct Checker {
    registry: Arc<GrammarRegistry>,
    semaphore: Arc<Semaphore>,
}

impl Checker {
    /// Create a checker with the default concurrency
    pub fn new(registry: Arc<GrammarRegistry>) -> Self {
        Self::with_concurrency(registry, DEFAULT_CONCURRENCY)
    }

    /// Create a checker decoding at most `concurrency` files at once
    pub fn with_concurrency(registry: Arc<GrammarRegistry>, concurrency: usize) -> Self {
        Self {
            registry,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Decode every blueprint file in `dir`
    pub async fn check_dir(
        &self,
        dir: &Path,
        mod_name: &str,
        version: &ModVersion,
        show_progress: bool,
    ) -> Result<CheckSummary, IoError> {
        let mut progress = Progress::new(show_progress);

        progress.spinner("Detecting blueprint files...");
        let files = detect_blueprints(dir)?;
        progress.finish_and_clear();
        tracing::debug!(dir = %dir.display(), files = files.len(), "detected blueprint files");

        let mut summary = CheckSummary {
            mod_name: mod_name.to_string(),
            mod_version: version.to_string(),
            ..CheckSummary::default()
        };
        if files.is_empty() {
            return Ok(summary);
        }

        progress.start(files.len() as u64, "Checking blueprints");

        let mut tasks = JoinSet::new();
        let mut task_paths: HashMap<Id, PathBuf> = HashMap::with_capacity(files.len());
        for path in files {
            let semaphore = Arc::clone(&self.semaphore);
            let registry = Arc::clone(&self.registry);
            let mod_name = mod_name.to_string();
            let version = version.clone();
            let task_path = path.clone();
            let handle = tasks.spawn(async move {
                let checked = check_file(&path, semaphore, registry, mod_name, version).await;
                (path, checked)
            });
            task_paths.insert(handle.id(), task_path);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, (path, Ok(result)))) => {
                    task_paths.remove(&id);
                    if let Some(diagnostic) = result.diagnostic() {
                        tracing::warn!(path = %path.display(), %diagnostic, "blueprint failed");
                    }
                    progress.set_message(&format!("Checked {}", file_name(&path)));
                    summary.files.push(FileReport { path, result });
                }
                Ok((id, (path, Err(message)))) => {
                    task_paths.remove(&id);
                    tracing::warn!(path = %path.display(), %message, "could not check file");
                    summary.errors.push(CheckError { path, message });
                }
                Err(e) => summary.errors.push(task_failure(&mut task_paths, dir, e)),
            }
            progress.inc();
        }
        progress.finish_and_clear();

        summary.files.sort_by(|a, b| a.path.cmp(&b.path));
        summary.errors.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(summary)
    }
}

async fn check_file(
    path: &Path,
    semaphore: Arc<Semaphore>,
    registry: Arc<GrammarRegistry>,
    mod_name: String,
    version: ModVersion,
) -> Result<ParseResult, String> {
    let _permit = semaphore.acquire_owned().await.map_err(|e| e.to_string())?;

    let encoded = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| IoError::generic(path, e).to_string())?;

    tokio::task::spawn_blocking(move || registry.decode(&encoded, &mod_name, &version))
        .await
        .map_err(|e| e.to_string())
}

/// Attribute a failed check task to the file it was checking
fn task_failure(
    task_paths: &mut HashMap<Id, PathBuf>,
    dir: &Path,
    error: JoinError,
) -> CheckError {
    let path = task_paths.remove(&error.id()).unwrap_or_else(|| dir.to_path_buf());
    tracing::error!(path = %path.display(), error = %error, "check task aborted");
    CheckError {
        path,
        message: error.to_string(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
