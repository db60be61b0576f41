//! CLI error types.
//!
//! A flat enum of command-level failure reasons, with `#[from]`
//! conversions from each library crate's own error type rather than
//! re-wrapping them in strings.

use thiserror::Error;

/// Errors surfaced by a `memento` subcommand.
#[derive(Debug, Error)]
pub enum CliError {
    /// Loading `MementoConfig` failed.
    #[error("configuration error: {0}")]
    Config(#[from] memento_config::ConfigError),

    /// A rollback subsystem call failed.
    #[error("rollback error: {0}")]
    Rollback(#[from] memento_rollback::RollbackError),

    /// A snapshot store call failed.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] memento_snapshot::SnapshotError),

    /// A pipeline call failed.
    #[error("pipeline error: {0}")]
    Pipeline(#[from] memento_pipeline::PipelineError),

    /// A temporal tracker call failed.
    #[error("temporal error: {0}")]
    Temporal(#[from] memento_temporal::TemporalError),

    /// The requested rollback point, operation, or strategy name was not
    /// recognized as CLI input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Reading or parsing a file argument (e.g. a test-suite report)
    /// failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path that was attempted.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A file argument's contents were not valid JSON.
    #[error("failed to parse {path} as JSON: {source}")]
    Json {
        /// The path whose contents failed to parse.
        path: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for CLI command handlers.
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_argument() {
        let err = CliError::InvalidArgument("unknown strategy: bogus".to_string());
        assert_eq!(err.to_string(), "invalid argument: unknown strategy: bogus");
    }

    #[test]
    fn error_from_rollback_error() {
        let err: CliError = memento_rollback::RollbackError::DatabaseNotReady.into();
        assert!(matches!(err, CliError::Rollback(_)));
        assert_eq!(err.to_string(), "rollback error: database not ready");
    }
}
