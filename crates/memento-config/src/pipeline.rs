//! Ingestion pipeline configuration: event bus, workers, batching, queues,
//! and monitoring.

use serde::{Deserialize, Serialize};

/// Which transport backs the event bus. Only `Memory` is implemented in
/// this workspace; `Redis`/`Nats` are accepted for configuration-shape
/// compatibility but rejected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventBusKind {
    /// Redis-backed event bus.
    Redis,
    /// NATS-backed event bus.
    Nats,
    /// In-process event bus (the only kind this workspace implements).
    Memory,
}

impl Default for EventBusKind {
    fn default() -> Self {
        Self::Memory
    }
}

/// Event bus connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusSettings {
    /// Which transport backs the bus.
    pub kind: EventBusKind,
    /// Connection URL, required for `Redis`/`Nats`.
    pub url: Option<String>,
    /// Number of partitions events are sharded across.
    pub partitions: usize,
}

impl Default for EventBusSettings {
    fn default() -> Self {
        Self {
            kind: EventBusKind::Memory,
            url: None,
            partitions: 16,
        }
    }
}

/// Worker pool sizing, one concurrency figure per worker type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersSettings {
    /// Parser worker concurrency.
    pub parsers: usize,
    /// Entity worker concurrency.
    pub entity_workers: usize,
    /// Relationship worker concurrency.
    pub relationship_workers: usize,
    /// Embedding worker concurrency.
    pub embedding_workers: usize,
}

impl Default for WorkersSettings {
    fn default() -> Self {
        Self {
            parsers: 4,
            entity_workers: 4,
            relationship_workers: 4,
            embedding_workers: 2,
        }
    }
}

/// Batch coordinator sizing and retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchingSettings {
    /// Maximum fragments per entity batch.
    pub entity_batch_size: usize,
    /// Maximum fragments per relationship batch.
    pub relationship_batch_size: usize,
    /// Maximum fragments per embedding batch.
    pub embedding_batch_size: usize,
    /// Maximum time, in milliseconds, a fragment waits before a forced
    /// flush.
    pub timeout_ms: u64,
    /// Maximum batches a coordinator processes concurrently.
    pub max_concurrent_batches: usize,
    /// Flush interval override, in milliseconds, independent of the
    /// per-fragment timeout.
    pub flush_interval_ms: Option<u64>,
    /// Idempotency-key dedup window, in milliseconds.
    pub idempotency_ttl_ms: Option<u64>,
    /// Maximum attempts before a batch is abandoned.
    pub max_attempts: u32,
    /// Multiplier applied to the backoff delay after each failed attempt.
    pub backoff_multiplier: f64,
    /// Ceiling, in milliseconds, on the backoff delay between attempts.
    pub max_backoff_ms: u64,
}

impl Default for BatchingSettings {
    fn default() -> Self {
        Self {
            entity_batch_size: 200,
            relationship_batch_size: 200,
            embedding_batch_size: 64,
            timeout_ms: 500,
            max_concurrent_batches: 4,
            flush_interval_ms: None,
            idempotency_ttl_ms: Some(10 * 60 * 1000),
            max_attempts: 3,
            backoff_multiplier: 2.0,
            max_backoff_ms: 30_000,
        }
    }
}

/// Queue sizing and retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueuesSettings {
    /// Total events held across all partitions before
    /// `PipelineError::QueueOverflow` is raised.
    pub max_size: usize,
    /// Number of partitions.
    pub partition_count: usize,
    /// Dequeue batch size.
    pub batch_size: usize,
    /// Dequeue batch timeout, in milliseconds.
    pub batch_timeout_ms: u64,
    /// Per-task retry attempts.
    pub retry_attempts: u32,
    /// Base delay, in milliseconds, between retries.
    pub retry_delay_ms: u64,
}

impl Default for QueuesSettings {
    fn default() -> Self {
        Self {
            max_size: 10_000,
            partition_count: 16,
            batch_size: 100,
            batch_timeout_ms: 1_000,
            retry_attempts: 3,
            retry_delay_ms: 100,
        }
    }
}

/// Alert thresholds evaluated against live telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Queue depth above which an `alert:triggered` event fires.
    pub queue_depth: usize,
    /// Processing latency, in milliseconds, above which an alert fires.
    pub latency_ms: u64,
    /// Error rate (0.0-1.0) above which an alert fires.
    pub error_rate: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            queue_depth: 5_000,
            latency_ms: 5_000,
            error_rate: 0.05,
        }
    }
}

/// Telemetry emission cadence and alert thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    /// Interval, in milliseconds, between `metrics:updated` emissions.
    pub metrics_interval_ms: u64,
    /// Interval, in milliseconds, between collaborator health checks.
    pub health_check_interval_ms: u64,
    /// Thresholds that trigger `alert:triggered`.
    pub alert_thresholds: AlertThresholds,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            metrics_interval_ms: 10_000,
            health_check_interval_ms: 30_000,
            alert_thresholds: AlertThresholds::default(),
        }
    }
}

/// The full pipeline configuration block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Event bus transport and sharding.
    pub event_bus: EventBusSettings,
    /// Worker pool concurrency, one figure per worker type.
    pub workers: WorkersSettings,
    /// Batch coordinator sizing and retry policy.
    pub batching: BatchingSettings,
    /// Queue sizing and retry policy.
    pub queues: QueuesSettings,
    /// Telemetry cadence and alert thresholds.
    pub monitoring: MonitoringSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            event_bus: EventBusSettings::default(),
            workers: WorkersSettings::default(),
            batching: BatchingSettings::default(),
            queues: QueuesSettings::default(),
            monitoring: MonitoringSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_bus_defaults_to_memory() {
        assert_eq!(EventBusSettings::default().kind, EventBusKind::Memory);
    }

    #[test]
    fn pipeline_settings_round_trip_through_json() {
        let settings = PipelineSettings::default();
        let json = serde_json::to_string(&settings).expect("serialize");
        let restored: PipelineSettings = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(settings, restored);
    }

    #[test]
    fn partial_json_fills_remaining_fields_with_defaults() {
        let settings: PipelineSettings =
            serde_json::from_str(r#"{"queues": {"max_size": 500}}"#).expect("partial");
        assert_eq!(settings.queues.max_size, 500);
        assert_eq!(settings.queues.partition_count, 16);
        assert_eq!(settings.workers, WorkersSettings::default());
    }
}
