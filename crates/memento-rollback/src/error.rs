//! Error types for the rollback store, strategies, and manager.

use thiserror::Error;

use crate::conflict::RollbackConflict;

/// Errors raised anywhere in the rollback subsystem.
#[derive(Debug, Error)]
pub enum RollbackError {
    /// A collaborator reported the database is not ready and
    /// `require_database_ready` is set.
    #[error("database not ready")]
    DatabaseNotReady,

    /// No strategy is registered under the requested name.
    #[error("unknown rollback strategy: {name}")]
    UnknownStrategy {
        /// The requested strategy name.
        name: String,
    },

    /// A strategy's `validate` step rejected the rollback context.
    #[error("strategy validation failed: {reason}")]
    StrategyValidationFailed {
        /// Why validation failed.
        reason: String,
    },

    /// No rollback point exists with the given ID.
    #[error("rollback point not found: {id}")]
    RollbackPointNotFound {
        /// The ID that was not found.
        id: String,
    },

    /// The rollback point's `expires_at` has passed.
    #[error("rollback point expired: {id}")]
    RollbackPointExpired {
        /// The expired point's ID.
        id: String,
    },

    /// No operation exists with the given ID.
    #[error("rollback operation not found: {id}")]
    OperationNotFound {
        /// The ID that was not found.
        id: String,
    },

    /// `cancel` was called on an operation that is not `in_progress`.
    #[error("operation {id} is not in progress (status: {status})")]
    OperationNotCancellable {
        /// The operation's ID.
        id: String,
        /// The operation's current status.
        status: String,
    },

    /// No snapshots exist for a rollback point where at least one was
    /// expected.
    #[error("no snapshots found for rollback point {id}")]
    NoSnapshotsFound {
        /// The rollback point's ID.
        id: String,
    },

    /// Conflicts were detected and the resolution policy is `Abort`.
    #[error("rollback aborted due to {} conflict(s)", .0.len())]
    Conflict(Vec<RollbackConflict>),

    /// `ConflictStrategy::AskUser` was selected but no resolver was
    /// supplied.
    #[error("conflict resolution requires a resolver but none was supplied")]
    ResolverRequired,

    /// A snapshot-layer error surfaced while capturing or restoring state.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] memento_snapshot::SnapshotError),

    /// A diff could not be applied.
    #[error("diff apply error: {0}")]
    Apply(#[from] memento_core::ApplyError),

    /// A collaborator call failed.
    #[error("collaborator error: {reason}")]
    Collaborator {
        /// The reason the collaborator call failed.
        reason: String,
    },

    /// The safe strategy failed mid-apply and also failed (or was unable)
    /// to restore from its safety backup.
    #[error("safe rollback failed: {original}{}", .restore.as_ref().map(|r| format!("; restore also failed: {r}")).unwrap_or_default())]
    SafeRollbackFailed {
        /// The error that interrupted the apply phase.
        original: Box<RollbackError>,
        /// The error encountered while restoring the safety backup, if
        /// the restore itself failed.
        restore: Option<Box<RollbackError>>,
    },
}

/// Result type for rollback subsystem operations.
pub type Result<T> = std::result::Result<T, RollbackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_database_not_ready() {
        assert_eq!(
            RollbackError::DatabaseNotReady.to_string(),
            "database not ready"
        );
    }

    #[test]
    fn error_display_conflict_reports_count() {
        let err = RollbackError::Conflict(vec![]);
        assert_eq!(err.to_string(), "rollback aborted due to 0 conflict(s)");
    }
}
