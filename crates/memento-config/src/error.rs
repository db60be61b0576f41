//! Error type for loading [`crate::MementoConfig`].

use thiserror::Error;

/// Errors raised while loading configuration from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// The path that was attempted.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file's contents could not be parsed as JSON.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// The path whose contents failed to parse.
        path: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for config loading operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
