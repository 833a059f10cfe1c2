//! Application error types using thiserror
//!
//! Error hierarchy:
//! - DecodeError: Encoded blueprint could not be decoded by its grammar
//! - VersionError: Mod versions that cannot be parsed or resolved
//! - CatalogError: Issues with the mod catalog file
//! - JobError / StoreError: Post-commit parse job and persistence failures
//! - ConfigError: Issues with CLI configuration
//! - IoError: File system operation failures

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Blueprint decoding errors
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Version parsing and resolution errors
    #[error(transparent)]
    Version(#[from] VersionError),

    /// Mod catalog errors
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Parse job errors
    #[error(transparent)]
    Job(#[from] JobError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO related errors
    #[error(transparent)]
    Io(#[from] IoError),
}

/// Errors produced while decoding an encoded blueprint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Structural parse failure (bad header, checksum mismatch, truncated data)
    #[error("malformed encoding: {detail}")]
    MalformedEncoding { detail: String },

    /// The grammar does not implement this mod version
    #[error("unsupported mod version: {mod_name} - {version}")]
    UnsupportedModVersion { mod_name: String, version: String },

    /// No grammar is registered for the mod
    #[error("no grammar registered for mod '{mod_name}'")]
    UnknownMod { mod_name: String },

    /// Decoding did not finish in time
    #[error("decoding exceeded the {limit:?} time limit")]
    Timeout { limit: Duration },
}

/// Errors related to mod version parsing and resolution
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// Version string is not `major.minor.patch[(.|-)suffix]`
    #[error("invalid version '{input}': {message}")]
    InvalidVersion { input: String, message: String },

    /// Version is not a known release of the mod
    #[error("version {version} is not a known release of {mod_name}")]
    UnknownVersion { mod_name: String, version: String },

    /// The mod's latest pointer names a version the mod does not know
    #[error("latest version {version} of {mod_name} cannot be resolved")]
    LatestUnresolvable { mod_name: String, version: String },

    /// A mod was declared without any releases
    #[error("mod '{mod_name}' has no releases")]
    EmptyReleaseList { mod_name: String },
}

/// Errors related to the mod catalog file
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Failed to read catalog file
    #[error("failed to read mod catalog {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("failed to parse mod catalog: {message}")]
    TomlParseError { message: String },

    /// An entry has an invalid version or latest pointer
    #[error("invalid entry for mod '{mod_name}': {source}")]
    InvalidEntry {
        mod_name: String,
        #[source]
        source: VersionError,
    },

    /// The same mod was declared twice
    #[error("mod '{mod_name}' is declared more than once")]
    DuplicateMod { mod_name: String },

    /// Mod is not present in the catalog
    #[error("mod '{mod_name}' not found in catalog")]
    ModNotFound { mod_name: String },
}

/// Errors raised by a blueprint store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or rejected the operation
    #[error("store unavailable: {message}")]
    Unavailable { message: String },
}

/// Errors related to the post-commit parse job
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// Blueprint no longer exists
    #[error("blueprint {id} not found")]
    BlueprintNotFound { id: u64 },

    /// Store kept failing after all retries
    #[error("store operation '{operation}' failed after {attempts} attempts: {source}")]
    StoreFailed {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    /// Decode task panicked or was cancelled
    #[error("decode task aborted: {message}")]
    TaskAborted { message: String },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid path
    #[error("invalid path '{path}': {message}")]
    InvalidPath { path: PathBuf, message: String },

    /// Option value out of range
    #[error("invalid value for --{name}: {message}")]
    InvalidValue { name: &'static str, message: String },
}

/// Errors related to IO operations
#[derive(Error, Debug)]
pub enum IoError {
    /// Directory not found
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// Generic IO error
    #[error("IO error at {path}: {source}")]
    Generic {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DecodeError {
    /// Creates a new MalformedEncoding error
    pub fn malformed(detail: impl Into<String>) -> Self {
        DecodeError::MalformedEncoding {
            detail: detail.into(),
        }
    }

    /// Creates a new UnsupportedModVersion error
    pub fn unsupported(mod_name: impl Into<String>, version: impl ToString) -> Self {
        DecodeError::UnsupportedModVersion {
            mod_name: mod_name.into(),
            version: version.to_string(),
        }
    }

    /// Creates a new UnknownMod error
    pub fn unknown_mod(mod_name: impl Into<String>) -> Self {
        DecodeError::UnknownMod {
            mod_name: mod_name.into(),
        }
    }
}

impl VersionError {
    /// Creates a new InvalidVersion error
    pub fn invalid(input: impl Into<String>, message: impl Into<String>) -> Self {
        VersionError::InvalidVersion {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Creates a new UnknownVersion error
    pub fn unknown_version(mod_name: impl Into<String>, version: impl ToString) -> Self {
        VersionError::UnknownVersion {
            mod_name: mod_name.into(),
            version: version.to_string(),
        }
    }

    /// Returns true for errors that mean no compatibility range can be produced
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            VersionError::UnknownVersion { .. } | VersionError::LatestUnresolvable { .. }
        )
    }
}

impl CatalogError {
    /// Creates a new ReadError
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CatalogError::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new TomlParseError
    pub fn toml_parse_error(message: impl Into<String>) -> Self {
        CatalogError::TomlParseError {
            message: message.into(),
        }
    }

    /// Creates a new ModNotFound error
    pub fn mod_not_found(mod_name: impl Into<String>) -> Self {
        CatalogError::ModNotFound {
            mod_name: mod_name.into(),
        }
    }
}

impl StoreError {
    /// Creates a new Unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            message: message.into(),
        }
    }
}

impl ConfigError {
    /// Creates a new InvalidPath error
    pub fn invalid_path(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ConfigError::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl IoError {
    /// Creates a new DirectoryNotFound error
    pub fn directory_not_found(path: impl Into<PathBuf>) -> Self {
        IoError::DirectoryNotFound { path: path.into() }
    }

    /// Creates a new Generic IO error
    pub fn generic(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IoError::Generic {
            path: path.into(),
            source,
        }
    }
}
