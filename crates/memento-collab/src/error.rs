//! Errors surfaced by collaborator implementations.

use thiserror::Error;

/// Errors a [`crate::graph::KnowledgeGraphService`], [`crate::session::SessionManager`],
/// or [`crate::filesystem::FileSystemService`] implementation may return.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollabError {
    /// No entity exists with the given ID.
    #[error("entity not found: {id}")]
    EntityNotFound {
        /// The ID that was not found.
        id: String,
    },

    /// A bulk relationship write rejected one or more relationships during
    /// validation.
    #[error("relationship validation failed: {reason}")]
    ValidationFailed {
        /// Why validation failed.
        reason: String,
    },

    /// No session data exists for the given session ID.
    #[error("session not found: {id}")]
    SessionNotFound {
        /// The session ID that was not found.
        id: String,
    },

    /// The underlying collaborator is unavailable.
    #[error("collaborator unavailable: {reason}")]
    Unavailable {
        /// A human-readable explanation.
        reason: String,
    },
}

/// Result type for collaborator operations.
pub type Result<T> = std::result::Result<T, CollabError>;
