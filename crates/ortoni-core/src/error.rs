//! Error types and exit codes for ortoni
//!
//! Exit codes:
//! - 0: Success
//! - 1: Generic failure, including fatal merge conditions (no valid shards,
//!   missing report folder)
//! - 2: Usage error (bad flags/args, invalid configuration values)

mod macros;

use std::path::PathBuf;
use thiserror::Error;

/// Process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success (0)
    Success = 0,
    /// Generic failure (1)
    Failure = 1,
    /// Usage error - bad flags/args (2)
    Usage = 2,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<rusqlite::Error> for OrtoniError {
    fn from(err: rusqlite::Error) -> Self {
        OrtoniError::Database(err.to_string())
    }
}

/// Errors that can occur while collecting, merging or persisting results
#[derive(Error, Debug)]
pub enum OrtoniError {
    // Usage errors (exit code 2)
    #[error("{0}")]
    UsageError(String),

    #[error("invalid {context}: {value}")]
    InvalidValue { context: String, value: String },

    // Fatal merge/report conditions (exit code 1)
    #[error("folder \"{}\" does not exist", path.display())]
    FolderNotFound { path: PathBuf },

    #[error("no shard files found to merge in {}", path.display())]
    NoShardFiles { path: PathBuf },

    #[error("no valid shard files to merge ({skipped} skipped)")]
    NoValidShards { skipped: usize },

    // Recoverable at the call site, reported as generic failures when propagated
    #[error("malformed shard {file}: {reason}")]
    MalformedShard { file: String, reason: String },

    #[error("history unavailable: {0}")]
    HistoryUnavailable(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("failed to read attachment {}: {reason}", path.display())]
    Attachment { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to {operation}: {reason}")]
    FailedOperation { operation: String, reason: String },

    #[error("failed to {operation} {target}: {reason}")]
    FailedOperationWithTarget {
        operation: String,
        target: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl OrtoniError {
    /// Create an error for a failed database operation
    pub fn db_operation(operation: &str, error: impl std::fmt::Display) -> Self {
        OrtoniError::FailedOperation {
            operation: operation.to_string(),
            reason: error.to_string(),
        }
    }

    /// Create an error for a failed transaction operation
    pub fn transaction(operation: &str, error: impl std::fmt::Display) -> Self {
        OrtoniError::FailedOperation {
            operation: format!("{} transaction", operation),
            reason: error.to_string(),
        }
    }

    /// Create an error for a failed IO operation with context
    pub fn io_operation(
        operation: &str,
        path: impl std::fmt::Display,
        error: impl std::fmt::Display,
    ) -> Self {
        OrtoniError::FailedOperationWithTarget {
            operation: operation.to_string(),
            target: path.to_string(),
            reason: error.to_string(),
        }
    }

    /// Create an error for an invalid value or configuration
    pub fn invalid_value(context: &str, value: impl std::fmt::Display) -> Self {
        OrtoniError::InvalidValue {
            context: context.to_string(),
            value: value.to_string(),
        }
    }

    /// Create an error for a shard that cannot be merged
    pub fn malformed_shard(file: &str, reason: impl std::fmt::Display) -> Self {
        OrtoniError::MalformedShard {
            file: file.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            OrtoniError::UsageError(_)
            | OrtoniError::InvalidValue { .. } => ExitCode::Usage,

            OrtoniError::FolderNotFound { .. }
            | OrtoniError::NoShardFiles { .. }
            | OrtoniError::NoValidShards { .. }
            | OrtoniError::MalformedShard { .. }
            | OrtoniError::HistoryUnavailable(_)
            | OrtoniError::Database(_)
            | OrtoniError::Attachment { .. }
            | OrtoniError::Io(_)
            | OrtoniError::Json(_)
            | OrtoniError::Toml(_)
            | OrtoniError::FailedOperation { .. }
            | OrtoniError::FailedOperationWithTarget { .. }
            | OrtoniError::Other(_) => ExitCode::Failure,
        }
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            OrtoniError::UsageError(_) => "usage_error",
            OrtoniError::InvalidValue { .. } => "invalid_value",
            OrtoniError::FolderNotFound { .. } => "folder_not_found",
            OrtoniError::NoShardFiles { .. } => "no_shard_files",
            OrtoniError::NoValidShards { .. } => "no_valid_shards",
            OrtoniError::MalformedShard { .. } => "malformed_shard",
            OrtoniError::HistoryUnavailable(_) => "history_unavailable",
            OrtoniError::Database(_) => "database_error",
            OrtoniError::Attachment { .. } => "attachment_error",
            OrtoniError::Io(_) => "io_error",
            OrtoniError::Json(_) => "json_error",
            OrtoniError::Toml(_) => "toml_error",
            OrtoniError::FailedOperation { .. } => "failed_operation",
            OrtoniError::FailedOperationWithTarget { .. } => "failed_operation_with_target",
            OrtoniError::Other(_) => "other",
        }
    }

    /// Convert error to JSON representation for structured error output.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.exit_code() as i32,
                "type": self.error_type(),
                "message": self.to_string(),
            }
        })
    }
}

/// Result type alias for ortoni operations
pub type Result<T> = std::result::Result<T, OrtoniError>;
