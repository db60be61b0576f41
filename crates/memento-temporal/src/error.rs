//! Error types for test-history tracking and session sequencing.

use thiserror::Error;

/// Errors raised by the temporal test-relationship tracker.
#[derive(Debug, Error)]
pub enum TemporalError {
    /// A test result failed basic shape validation.
    #[error("invalid test result for {test_id}: {reason}")]
    InvalidTestResult {
        /// The offending test's ID.
        test_id: String,
        /// Why the result was rejected.
        reason: String,
    },

    /// No execution history exists for a test entity.
    #[error("no execution history for test {test_id}")]
    NoHistory {
        /// The test entity's ID.
        test_id: String,
    },

    /// A collaborator call failed.
    #[error("collaborator error: {reason}")]
    Collaborator {
        /// Why the collaborator call failed.
        reason: String,
    },

    /// Seeding an incident checkpoint failed.
    #[error("incident checkpoint failed: {reason}")]
    IncidentCheckpoint {
        /// Why the checkpoint could not be created.
        reason: String,
    },
}

/// Result type for temporal-tracking operations.
pub type Result<T> = std::result::Result<T, TemporalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_test_result() {
        let err = TemporalError::InvalidTestResult {
            test_id: "t1".to_string(),
            reason: "duration must be >= 0".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid test result for t1: duration must be >= 0"
        );
    }

    #[test]
    fn error_display_no_history() {
        let err = TemporalError::NoHistory {
            test_id: "t1".to_string(),
        };
        assert_eq!(err.to_string(), "no execution history for test t1");
    }
}
