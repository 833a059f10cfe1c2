//! Post-commit parse job
//!
//! After a blueprint commit that changed the encoded blueprint, the job
//! decodes the committed encoding and stores the parsed data:
//! - Runs at most one job per blueprint at a time
//! - Skips work when the stored parsed data already matches the committed revision
//! - Bounds decoding with a timeout, recorded as a `Timeout` failure
//! - Retries store operations with exponential backoff

mod store;

pub use store::{BlueprintStore, InMemoryStore};

use crate::domain::{
    BlueprintField, BlueprintId, BlueprintRecord, Commit, Diagnostic, ParseResult,
    ParsedBlueprintData,
};
use crate::error::{DecodeError, JobError, StoreError};
use crate::grammar::GrammarRegistry;
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Maximum number of retry attempts for store operations
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (in milliseconds)
const BASE_DELAY_MS: u64 = 100;

/// Default upper bound on a single decode
const DEFAULT_DECODE_TIMEOUT: Duration = Duration::from_secs(5);

/// Parse job settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobConfig {
    /// Retries after the first failed store call
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each further retry
    pub base_delay: Duration,
    /// Time allowed for one decode
    pub decode_timeout: Duration,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
            decode_timeout: DEFAULT_DECODE_TIMEOUT,
        }
    }
}

impl JobConfig {
    /// Backoff before retry number `attempt`, counted from 1
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base backoff delay
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Set the decode timeout
    pub fn with_decode_timeout(mut self, decode_timeout: Duration) -> Self {
        self.decode_timeout = decode_timeout;
        self
    }
}

/// Why a job did not write anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The commit did not touch the encoded blueprint
    EncodingUnchanged,
    /// Parsed data for this revision is already stored
    AlreadyParsed { revision: u64 },
}

/// Result of running the job once
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Decoded and stored
    Parsed { revision: u64 },
    /// Decoding failed; the diagnostic was stored
    Failed { revision: u64, diagnostic: Diagnostic },
    /// Nothing to do
    Skipped(SkipReason),
}

impl JobOutcome {
    /// Returns true if the job stored parsed data
    pub fn wrote(&self) -> bool {
        !matches!(self, JobOutcome::Skipped(_))
    }
}

/// Runs parse jobs against a store
pub struct ParseJobRunner<S: BlueprintStore> {
    store: Arc<S>,
    registry: Arc<GrammarRegistry>,
    config: JobConfig,
    locks: Mutex<HashMap<BlueprintId, Arc<Mutex<()>>>>,
}

impl<S: BlueprintStore> ParseJobRunner<S> {
    /// Create a runner with default settings
    pub fn new(store: Arc<S>, registry: Arc<GrammarRegistry>) -> Self {
        Self::with_config(store, registry, JobConfig::default())
    }

    /// Create a runner with custom settings
    pub fn with_config(store: Arc<S>, registry: Arc<GrammarRegistry>, config: JobConfig) -> Self {
        Self {
            store,
            registry,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the settings
    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Hook run after a commit; only encoding changes trigger a parse
    pub async fn after_commit(&self, commit: &Commit) -> Result<JobOutcome, JobError> {
        if !commit.saved_change_to(BlueprintField::EncodedBlueprint) {
            tracing::debug!(id = %commit.id, revision = commit.revision, "encoding unchanged, skipping parse");
            return Ok(JobOutcome::Skipped(SkipReason::EncodingUnchanged));
        }
        self.perform(commit.id).await
    }

    /// Decode the committed encoding of a blueprint and store the result
    pub async fn perform(&self, id: BlueprintId) -> Result<JobOutcome, JobError> {
        let lock = self.entity_lock(id).await;
        let outcome = {
            let _guard = lock.lock().await;
            self.perform_locked(id).await
        };
        drop(lock);
        self.release_lock(id).await;
        outcome
    }

    async fn perform_locked(&self, id: BlueprintId) -> Result<JobOutcome, JobError> {
        let record = self
            .with_retry("load", move || self.store.load(id))
            .await?
            .ok_or(JobError::BlueprintNotFound { id: id.0 })?;

        let parsed_revision = self
            .with_retry("parsed_revision", move || self.store.parsed_revision(id))
            .await?;
        if parsed_revision == Some(record.revision) {
            tracing::debug!(%id, revision = record.revision, "parsed data already current");
            return Ok(JobOutcome::Skipped(SkipReason::AlreadyParsed {
                revision: record.revision,
            }));
        }

        let result = self.decode(&record).await?;
        let outcome = match &result {
            ParseResult::Success(decoded) => {
                tracing::info!(%id, revision = record.revision, format = decoded.format_name(), "blueprint parsed");
                JobOutcome::Parsed {
                    revision: record.revision,
                }
            }
            ParseResult::Failure(diagnostic) => {
                tracing::warn!(%id, revision = record.revision, %diagnostic, "blueprint failed to parse");
                JobOutcome::Failed {
                    revision: record.revision,
                    diagnostic: diagnostic.clone(),
                }
            }
        };

        let data = ParsedBlueprintData {
            blueprint_id: id,
            revision: record.revision,
            outcome: result.into(),
            parsed_at: Utc::now(),
        };
        self.with_retry("save_parsed", move || self.store.save_parsed(data.clone()))
            .await?;

        Ok(outcome)
    }

    async fn decode(&self, record: &BlueprintRecord) -> Result<ParseResult, JobError> {
        let registry = Arc::clone(&self.registry);
        let encoded = record.encoded_blueprint.clone();
        let mod_name = record.mod_name.clone();
        let version = record.mod_version.clone();
        let task =
            tokio::task::spawn_blocking(move || registry.decode(&encoded, &mod_name, &version));

        let limit = self.config.decode_timeout;
        match tokio::time::timeout(limit, task).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(JobError::TaskAborted {
                message: e.to_string(),
            }),
            Err(_) => Ok(ParseResult::Failure(Diagnostic::from_error(
                &record.mod_name,
                &record.mod_version,
                &DecodeError::Timeout { limit },
            ))),
        }
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, JobError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::warn!(operation, attempt, error = %e, "store call failed, retrying");
                    tokio::time::sleep(self.config.retry_delay(attempt)).await;
                }
                Err(e) => {
                    tracing::error!(operation, attempts = attempt + 1, error = %e, "store call failed");
                    return Err(JobError::StoreFailed {
                        operation,
                        attempts: attempt + 1,
                        source: e,
                    });
                }
            }
        }
    }

    async fn entity_lock(&self, id: BlueprintId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(id).or_default())
    }

    async fn release_lock(&self, id: BlueprintId) {
        let mut locks = self.locks.lock().await;
        if locks.get(&id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&id);
        }
    }
}
