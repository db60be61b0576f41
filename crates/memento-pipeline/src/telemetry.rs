//! Pipeline-wide telemetry snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::queue::QueueMetrics;
use crate::worker::WorkerKind;

/// Health and throughput of a single worker kind, sampled over the
/// current reporting window.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkerMetrics {
    /// Which kind of worker this reports on.
    pub kind: Option<&'static str>,
    /// Tasks currently executing.
    pub active_tasks: usize,
    /// Tasks completed since the last report.
    pub completed: u64,
    /// Tasks retried since the last report.
    pub retried: u64,
    /// Tasks abandoned (retries exhausted) since the last report.
    pub abandoned: u64,
}

impl WorkerMetrics {
    /// An empty metrics record for the given worker kind.
    #[must_use]
    pub fn for_kind(kind: WorkerKind) -> Self {
        Self {
            kind: Some(kind.name()),
            ..Self::default()
        }
    }
}

/// Aggregated error counts and representative samples across the
/// pipeline's current reporting window.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErrorSummary {
    /// Total errors observed.
    pub count: u64,
    /// Counts grouped by a short error-type label.
    pub types: std::collections::HashMap<String, u64>,
    /// A bounded sample of recent error messages.
    pub samples: Vec<String>,
}

/// Coarse resource usage attributed to the pipeline's own processing.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PerformanceMetrics {
    /// CPU utilization, 0.0-1.0.
    pub cpu: f64,
    /// Resident memory, in bytes.
    pub memory_bytes: u64,
    /// Disk bytes read and written since the last report.
    pub disk_io_bytes: u64,
    /// Network bytes sent and received since the last report.
    pub network_io_bytes: u64,
}

/// A point-in-time snapshot of pipeline health, suitable for export to
/// a monitoring collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// When this record was produced.
    pub timestamp: DateTime<Utc>,
    /// A human-readable pipeline identifier (e.g. namespace).
    pub pipeline: String,
    /// Per-queue health, keyed by queue name.
    pub queues: std::collections::HashMap<String, QueueMetrics>,
    /// Per-worker-kind health.
    pub workers: Vec<WorkerMetrics>,
    /// Aggregated error counts.
    pub errors: ErrorSummary,
    /// Coarse resource usage.
    pub performance: PerformanceMetrics,
}

impl TelemetryRecord {
    /// Builds an empty record for `pipeline`, stamped at `now`.
    #[must_use]
    pub fn empty(pipeline: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now,
            pipeline: pipeline.into(),
            queues: std::collections::HashMap::new(),
            workers: Vec::new(),
            errors: ErrorSummary::default(),
            performance: PerformanceMetrics::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_record_has_no_queues_or_workers() {
        let record = TelemetryRecord::empty("ns", Utc::now());
        assert!(record.queues.is_empty());
        assert!(record.workers.is_empty());
        assert_eq!(record.errors.count, 0);
    }

    #[test]
    fn worker_metrics_for_kind_carries_the_kind_name() {
        let metrics = WorkerMetrics::for_kind(WorkerKind::Embedding);
        assert_eq!(metrics.kind, Some("embedding"));
    }
}
