//! Partitioned ingestion pipeline: event bus, worker pool, and batch
//! coordinator.
//!
//! # Modules
//!
//! - [`queue`]: the partitioned, bounded event bus.
//! - [`worker`]: the bounded-concurrency worker pool with retry/backoff.
//! - [`batch`]: per-type batch accumulation, dependency ordering, and
//!   idempotent writes.
//! - [`telemetry`]: the pipeline-wide health snapshot.
//! - [`error`]: the crate's error taxonomy.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod error;
pub mod queue;
pub mod telemetry;
pub mod worker;

pub use batch::{Batch, BatchConfig, BatchCoordinator, BatchOutcome, Fragment, FragmentType};
pub use error::{PipelineError, Result};
pub use queue::{ChangeEvent, EventType, PartitionedQueue, QueueConfig, QueueMetrics};
pub use telemetry::{ErrorSummary, PerformanceMetrics, TelemetryRecord, WorkerMetrics};
pub use worker::{RetryPolicy, Task, Worker, WorkerConfig, WorkerKind, WorkerPool};
