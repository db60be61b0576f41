//! Partitioned, bounded event queue feeding the worker pool.
//!
//! Partition assignment hashes `{namespace, module, file_path}` so that
//! every change for a given file lands on the same partition and is
//! processed in arrival order there.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{PipelineError, Result};

/// The kind of filesystem change a [`ChangeEvent`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A new file was created.
    Created,
    /// An existing file's contents changed.
    Modified,
    /// A file was removed.
    Deleted,
}

/// A single ingested filesystem change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Unique event ID, used for at-least-once dedup downstream.
    pub id: String,
    /// The project/workspace namespace this change belongs to.
    pub namespace: String,
    /// The module within the namespace.
    pub module: String,
    /// Path to the file that changed, relative to the module root.
    pub file_path: String,
    /// What kind of change this was.
    pub event_type: EventType,
    /// When the change was observed.
    pub timestamp: DateTime<Utc>,
    /// Hash of the diff payload, used to detect duplicate deliveries.
    pub diff_hash: String,
}

/// Computes the partition key for a change event: same file, same
/// partition, preserving per-file ordering.
#[must_use]
pub fn partition_key(namespace: &str, module: &str, file_path: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    namespace.hash(&mut hasher);
    module.hash(&mut hasher);
    file_path.hash(&mut hasher);
    hasher.finish()
}

/// Configuration for a [`PartitionedQueue`].
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Number of partitions the queue is split across.
    pub partition_count: usize,
    /// Maximum total events held across all partitions before
    /// [`PipelineError::QueueOverflow`] is raised.
    pub max_size: usize,
    /// Per-partition channel capacity.
    pub partition_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            partition_count: 16,
            max_size: 10_000,
            partition_capacity: 1_024,
        }
    }
}

/// Snapshot of queue health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMetrics {
    /// Total events currently queued across all partitions.
    pub queue_depth: usize,
    /// Age, in milliseconds, of the oldest still-queued event.
    pub oldest_event_age_ms: Option<u64>,
    /// Per-partition backlog size.
    pub partition_lag: Vec<usize>,
    /// Events drained per second, measured over the last reporting window.
    pub throughput_per_second: f64,
    /// Fraction of recently dequeued events that failed processing.
    pub error_rate: f64,
}

struct Partition {
    sender: mpsc::Sender<ChangeEvent>,
    receiver: parking_lot::Mutex<mpsc::Receiver<ChangeEvent>>,
}

/// A fixed number of ordered, bounded partitions feeding the worker pool.
pub struct PartitionedQueue {
    partitions: Vec<Partition>,
    config: QueueConfig,
    total_size: std::sync::atomic::AtomicUsize,
    oldest_enqueued_at: parking_lot::Mutex<Option<Instant>>,
    dequeued: std::sync::atomic::AtomicU64,
    dequeue_errors: std::sync::atomic::AtomicU64,
    started_at: Instant,
}

impl PartitionedQueue {
    /// Builds a queue with `config.partition_count` partitions, each
    /// bounded by `config.partition_capacity`.
    #[must_use]
    pub fn new(config: QueueConfig) -> Self {
        let partitions = (0..config.partition_count.max(1))
            .map(|_| {
                let (sender, receiver) = mpsc::channel(config.partition_capacity.max(1));
                Partition {
                    sender,
                    receiver: parking_lot::Mutex::new(receiver),
                }
            })
            .collect();
        Self {
            partitions,
            config,
            total_size: std::sync::atomic::AtomicUsize::new(0),
            oldest_enqueued_at: parking_lot::Mutex::new(None),
            dequeued: std::sync::atomic::AtomicU64::new(0),
            dequeue_errors: std::sync::atomic::AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    fn partition_index(&self, event: &ChangeEvent) -> usize {
        let key = partition_key(&event.namespace, &event.module, &event.file_path);
        (key as usize) % self.partitions.len()
    }

    /// Enqueues an event onto its owning partition.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::QueueOverflow`] if the queue's total size
    /// across all partitions has reached `max_size`, or if the owning
    /// partition's bounded channel is full.
    pub fn enqueue(&self, event: ChangeEvent) -> Result<()> {
        use std::sync::atomic::Ordering;

        let size = self.total_size.load(Ordering::SeqCst);
        if size >= self.config.max_size {
            return Err(PipelineError::QueueOverflow {
                queue: "partitioned-queue".to_string(),
                size,
                max: self.config.max_size,
            });
        }
        let idx = self.partition_index(&event);
        self.partitions[idx]
            .sender
            .try_send(event)
            .map_err(|_| PipelineError::QueueOverflow {
                queue: format!("partition-{idx}"),
                size: self.config.partition_capacity,
                max: self.config.partition_capacity,
            })?;
        self.total_size.fetch_add(1, Ordering::SeqCst);
        let mut oldest = self.oldest_enqueued_at.lock();
        if oldest.is_none() {
            *oldest = Some(Instant::now());
        }
        Ok(())
    }

    /// Dequeues the next event from a specific partition, if any is ready.
    pub async fn dequeue(&self, partition: usize) -> Option<ChangeEvent> {
        use std::sync::atomic::Ordering;

        let event = {
            let mut rx = self.partitions[partition].receiver.lock();
            rx.try_recv().ok()
        };
        if event.is_some() {
            self.total_size.fetch_sub(1, Ordering::SeqCst);
            self.dequeued.fetch_add(1, Ordering::SeqCst);
            if self.total_size.load(Ordering::SeqCst) == 0 {
                *self.oldest_enqueued_at.lock() = None;
            }
        }
        event
    }

    /// Records that a dequeued event failed processing, for error-rate
    /// reporting.
    pub fn record_error(&self) {
        self.dequeue_errors
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    /// Number of partitions.
    #[must_use]
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Current health snapshot.
    #[must_use]
    pub fn metrics(&self) -> QueueMetrics {
        use std::sync::atomic::Ordering;

        let partition_lag = self
            .partitions
            .iter()
            .map(|p| self.config.partition_capacity - p.sender.capacity())
            .collect();
        let dequeued = self.dequeued.load(Ordering::SeqCst);
        let errors = self.dequeue_errors.load(Ordering::SeqCst);
        let elapsed = self.started_at.elapsed().as_secs_f64().max(1e-6);
        QueueMetrics {
            queue_depth: self.total_size.load(Ordering::SeqCst),
            oldest_event_age_ms: self
                .oldest_enqueued_at
                .lock()
                .map(|t| t.elapsed().as_millis() as u64),
            partition_lag,
            throughput_per_second: dequeued as f64 / elapsed,
            error_rate: if dequeued == 0 {
                0.0
            } else {
                errors as f64 / dequeued as f64
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, file_path: &str) -> ChangeEvent {
        ChangeEvent {
            id: id.to_string(),
            namespace: "ns".to_string(),
            module: "mod".to_string(),
            file_path: file_path.to_string(),
            event_type: EventType::Modified,
            timestamp: Utc::now(),
            diff_hash: "hash".to_string(),
        }
    }

    #[test]
    fn same_file_always_maps_to_same_partition() {
        let a = partition_key("ns", "mod", "a.rs");
        let b = partition_key("ns", "mod", "a.rs");
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn enqueue_dequeue_round_trips_in_order() {
        let queue = PartitionedQueue::new(QueueConfig {
            partition_count: 1,
            max_size: 10,
            partition_capacity: 10,
        });
        queue.enqueue(event("e1", "a.rs")).unwrap();
        queue.enqueue(event("e2", "a.rs")).unwrap();

        let first = queue.dequeue(0).await.unwrap();
        let second = queue.dequeue(0).await.unwrap();
        assert_eq!(first.id, "e1");
        assert_eq!(second.id, "e2");
    }

    #[test]
    fn overflow_raises_when_total_size_reaches_max() {
        let queue = PartitionedQueue::new(QueueConfig {
            partition_count: 2,
            max_size: 1,
            partition_capacity: 10,
        });
        queue.enqueue(event("e1", "a.rs")).unwrap();
        let err = queue.enqueue(event("e2", "b.rs")).unwrap_err();
        assert!(matches!(err, PipelineError::QueueOverflow { .. }));
    }

    #[tokio::test]
    async fn metrics_report_queue_depth() {
        let queue = PartitionedQueue::new(QueueConfig {
            partition_count: 1,
            max_size: 10,
            partition_capacity: 10,
        });
        queue.enqueue(event("e1", "a.rs")).unwrap();
        assert_eq!(queue.metrics().queue_depth, 1);
        queue.dequeue(0).await.unwrap();
        assert_eq!(queue.metrics().queue_depth, 0);
    }
}
