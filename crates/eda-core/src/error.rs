use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the case-data pipeline.
#[derive(Error, Debug)]
pub enum EdaError {
    /// The source file could not be opened or read from disk.
    #[error("Source unavailable {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A row could not be parsed (bad date, non-numeric count, missing region).
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    /// A requested column is not part of the table it was asked of.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A ratio was requested for a group whose denominator is zero.
    #[error("Division undefined for group {group}: {numerator} / 0")]
    DivisionUndefined { group: String, numerator: i64 },

    /// Summing or subtracting counts left the `i64` range.
    #[error("Count overflow: {0}")]
    CountOverflow(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be parsed or written.
    #[error("Failed to process JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EdaError {
    /// `true` for the kinds that abort a pipeline run.
    ///
    /// [`EdaError::DivisionUndefined`] is surfaced per row and never aborts.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EdaError::DivisionUndefined { .. })
    }
}

/// Convenience alias used throughout the pipeline crates.
pub type Result<T> = std::result::Result<T, EdaError>;
