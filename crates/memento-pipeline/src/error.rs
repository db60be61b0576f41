//! Error types for the ingestion pipeline.

use thiserror::Error;

/// Errors raised anywhere in the ingestion pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A partition's bounded size was exceeded. Not retryable; the caller
    /// must shed load or widen capacity.
    #[error("queue overflow on {queue}: size {size} exceeds max {max}")]
    QueueOverflow {
        /// The overflowing queue or partition's name.
        queue: String,
        /// The size that was rejected.
        size: usize,
        /// The configured ceiling.
        max: usize,
    },

    /// A batch failed after exhausting its retry budget.
    #[error("batch processing failed: {processed} processed, {failed} failed")]
    BatchProcessing {
        /// Items that succeeded before the batch gave up.
        processed: usize,
        /// Items that failed.
        failed: usize,
        /// Per-item failure reasons, indexed the same as the failing items.
        reasons: Vec<String>,
    },

    /// A worker task failed.
    #[error("worker error: {reason}")]
    Worker {
        /// Why the task failed.
        reason: String,
        /// Whether the caller should retry the task.
        retryable: bool,
    },

    /// A dependency DAG over a fragment set contains a cycle. The cycle
    /// is surfaced as a diagnostic, not treated as fatal: the coordinator
    /// still processes the cyclic fragments, in arbitrary order.
    #[error("dependency cycle detected among fragments: {fragment_ids:?}")]
    DependencyCycle {
        /// IDs of the fragments participating in the cycle.
        fragment_ids: Vec<String>,
    },

    /// A collaborator call failed while writing a batch to the graph.
    #[error("collaborator error: {reason}")]
    Collaborator {
        /// The reason the collaborator call failed.
        reason: String,
    },

    /// The pipeline was shut down while an operation was in flight.
    #[error("pipeline shutting down")]
    ShuttingDown,
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_queue_overflow() {
        let err = PipelineError::QueueOverflow {
            queue: "partition-2".to_string(),
            size: 101,
            max: 100,
        };
        assert_eq!(
            err.to_string(),
            "queue overflow on partition-2: size 101 exceeds max 100"
        );
    }

    #[test]
    fn error_display_batch_processing() {
        let err = PipelineError::BatchProcessing {
            processed: 8,
            failed: 2,
            reasons: vec!["timeout".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "batch processing failed: 8 processed, 2 failed"
        );
    }
}
