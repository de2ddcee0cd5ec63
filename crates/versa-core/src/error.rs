//! Error types for the core crate.

use thiserror::Error;
use versa_diff::DiffError;
use versa_storage::StorageError;

/// Errors raised by the version services.
#[derive(Debug, Error)]
pub enum VersionError {
    /// A caller supplied an unusable value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Version or content absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Comparison input over the configured cap.
    #[error("content of {size} bytes exceeds maximum comparison size of {limit} bytes")]
    SizeExceeded { size: usize, limit: usize },

    /// Structured content could not be parsed.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Underlying persistence failure.
    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl VersionError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{kind} {id}"))
    }

    /// Status code used on the wire.
    pub fn code(&self) -> u16 {
        match self {
            Self::InvalidArgument(_) => 400,
            Self::NotFound(_) => 404,
            Self::SizeExceeded { .. } => 413,
            Self::InvalidFormat(_) => 422,
            Self::Storage(_) => 500,
        }
    }

    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::SizeExceeded { .. } => "size_exceeded",
            Self::InvalidFormat(_) => "invalid_format",
            Self::Storage(_) => "storage_failure",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<StorageError> for VersionError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => Self::NotFound(what),
            StorageError::InvalidKey(msg) => Self::InvalidArgument(msg),
            other => Self::Storage(other),
        }
    }
}

impl From<DiffError> for VersionError {
    fn from(err: DiffError) -> Self {
        match err {
            DiffError::SizeExceeded { size, limit } => Self::SizeExceeded { size, limit },
            DiffError::InvalidFormat(msg) => Self::InvalidFormat(msg),
        }
    }
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid JSON/JSONC syntax.
    #[error("invalid config at {path}: {message}")]
    InvalidJson { path: String, message: String },

    /// Environment variable not found during substitution.
    #[error("environment variable not found: {name}")]
    EnvVarNotFound { name: String },

    /// An override variable held an unusable value.
    #[error("invalid value for {name}: {value}")]
    InvalidOverride { name: String, value: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
