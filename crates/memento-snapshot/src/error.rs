//! Error types for the snapshot store.

use thiserror::Error;

/// Errors raised by [`crate::store::SnapshotStore`].
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A serialized snapshot would exceed the configured size ceiling.
    #[error("snapshot too large: {size} bytes exceeds ceiling of {max} bytes")]
    TooLarge {
        /// The serialized size that was rejected.
        size: usize,
        /// The configured ceiling.
        max: usize,
    },

    /// The stored checksum does not match the recomputed checksum.
    #[error("snapshot corrupted: checksum mismatch for {id}")]
    Corrupted {
        /// The snapshot ID whose checksum failed verification.
        id: String,
    },

    /// No snapshot exists with the given ID.
    #[error("snapshot not found: {id}")]
    NotFound {
        /// The snapshot ID that was not found.
        id: String,
    },

    /// Two snapshots passed to a diff operation have different `type`s.
    #[error("snapshot type mismatch: {expected} vs {actual}")]
    TypeMismatch {
        /// The expected type.
        expected: String,
        /// The actual type encountered.
        actual: String,
    },
}

/// Result type for snapshot store operations.
pub type Result<T> = std::result::Result<T, SnapshotError>;
