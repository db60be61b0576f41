//! Worker pool executing tasks drained from a [`crate::queue::PartitionedQueue`].
//!
//! Tasks carry a priority ("larger = sooner") honored within a partition,
//! and a retry policy with exponential backoff. Shutdown drains in-flight
//! tasks up to a grace period before giving up.

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::timeout;

use crate::error::{PipelineError, Result};

/// What a [`Task`] is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    /// Parses raw source into an intermediate representation.
    Parser,
    /// Extracts and upserts entities.
    Entity,
    /// Extracts and upserts relationships between entities.
    Relationship,
    /// Computes and stores embeddings.
    Embedding,
}

impl WorkerKind {
    /// A stable lowercase name, used in telemetry and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Parser => "parser",
            Self::Entity => "entity",
            Self::Relationship => "relationship",
            Self::Embedding => "embedding",
        }
    }
}

/// A unit of work dispatched to a [`Worker`].
#[derive(Debug, Clone)]
pub struct Task {
    /// Unique task ID.
    pub id: String,
    /// Which worker kind should execute this task.
    pub kind: WorkerKind,
    /// Larger values are dispatched before smaller ones within a partition.
    pub priority: i32,
    /// Task payload.
    pub data: Value,
    /// Free-form metadata carried alongside the payload.
    pub metadata: Value,
    /// Number of attempts made so far.
    pub retry_count: u32,
    /// Maximum attempts before the task is abandoned.
    pub max_retries: u32,
    /// Monotonic sequence number used to break priority ties (FIFO).
    pub sequence: u64,
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}
impl Eq for Task {}

impl PartialOrd for Task {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Task {
    /// Larger priority sorts "greater" (dispatched first via a max-heap);
    /// ties broken by earlier sequence number winning.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Exponential backoff with a cap, applied between task retries.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Base delay before the first retry.
    pub base: Duration,
    /// Maximum delay, regardless of attempt count.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// The backoff delay for the given (zero-based) attempt number.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(20));
        self.base.saturating_mul(factor).min(self.max_backoff)
    }
}

/// Executes [`Task`]s of a particular [`WorkerKind`].
#[async_trait]
pub trait Worker: Send + Sync {
    /// The kind of task this worker executes.
    fn kind(&self) -> WorkerKind;

    /// Executes a single task. Errors with `retryable: true` cause the
    /// pool to reschedule the task (subject to `max_retries`); all other
    /// errors abandon it immediately.
    async fn execute(&self, task: &Task) -> Result<()>;
}

/// Tunables for a [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of tasks executed concurrently.
    pub concurrency: usize,
    /// How long a single task execution may run before being timed out
    /// (counted as a retryable failure).
    pub task_timeout: Duration,
    /// How long [`WorkerPool::shutdown`] lets in-flight tasks keep
    /// retrying before the run loop gives up on them.
    pub shutdown_grace_period: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            task_timeout: Duration::from_secs(30),
            shutdown_grace_period: Duration::from_secs(10),
        }
    }
}

/// Runs tasks against a single [`Worker`] implementation with bounded
/// concurrency, retry-with-backoff, and graceful shutdown.
///
/// Internally, `concurrency` loops compete for tasks off one shared
/// receiver — `tokio::sync::mpsc::Receiver` isn't `Clone`, so it's wrapped
/// in a `Mutex` and re-locked for each `recv`.
pub struct WorkerPool<W: Worker + 'static> {
    worker: Arc<W>,
    config: WorkerConfig,
    sender: mpsc::Sender<Task>,
    receiver: Arc<Mutex<mpsc::Receiver<Task>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<W: Worker + 'static> WorkerPool<W> {
    /// Builds a pool around `worker`, with an internal task queue bounded
    /// by `config.concurrency * 4`.
    #[must_use]
    pub fn new(worker: Arc<W>, config: WorkerConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.concurrency.max(1) * 4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            worker,
            config,
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Submits a task for execution.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ShuttingDown`] if the pool's internal
    /// queue has been closed.
    pub async fn submit(&self, task: Task) -> Result<()> {
        self.sender
            .send(task)
            .await
            .map_err(|_| PipelineError::ShuttingDown)
    }

    /// Runs the pool until [`Self::shutdown`] is called and the grace
    /// period elapses, spawning `concurrency` loops that pull tasks,
    /// execute them with a timeout, and retry retryable failures with
    /// backoff.
    pub async fn run(&self) {
        let mut handles = Vec::with_capacity(self.config.concurrency.max(1));
        for _ in 0..self.config.concurrency.max(1) {
            let worker = self.worker.clone();
            let receiver = self.receiver.clone();
            let config = self.config.clone();
            let requeue = self.sender.clone();
            let mut shutdown_rx = self.shutdown_rx.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let task = tokio::select! {
                        biased;
                        changed = shutdown_rx.changed() => {
                            if changed.is_err() || *shutdown_rx.borrow() {
                                None
                            } else {
                                continue;
                            }
                        }
                        task = async { receiver.lock().await.recv().await } => task,
                    };
                    let Some(task) = task else { break };
                    run_one(&*worker, task, &config, &requeue).await;
                }
            }));
        }

        tokio::time::sleep(self.config.shutdown_grace_period).await;
        for handle in handles {
            handle.abort();
        }
    }

    /// Signals the run loop to stop pulling new work once the grace
    /// period in [`Self::run`] elapses.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

async fn run_one<W: Worker>(
    worker: &W,
    mut task: Task,
    config: &WorkerConfig,
    requeue: &mpsc::Sender<Task>,
) {
    let result = timeout(config.task_timeout, worker.execute(&task)).await;
    match result {
        Ok(Ok(())) => {}
        Ok(Err(PipelineError::Worker { retryable: true, .. })) | Err(_) => {
            if task.retry_count < task.max_retries {
                task.retry_count += 1;
                let policy = RetryPolicy::default();
                tokio::time::sleep(policy.backoff_for(task.retry_count)).await;
                let _ = requeue.send(task).await;
            }
        }
        Ok(Err(_)) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingWorker {
        calls: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl Worker for CountingWorker {
        fn kind(&self) -> WorkerKind {
            WorkerKind::Entity
        }

        async fn execute(&self, _task: &Task) -> Result<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && n == 0 {
                return Err(PipelineError::Worker {
                    reason: "transient".to_string(),
                    retryable: true,
                });
            }
            Ok(())
        }
    }

    fn task(id: &str) -> Task {
        Task {
            id: id.to_string(),
            kind: WorkerKind::Entity,
            priority: 0,
            data: Value::Null,
            metadata: Value::Null,
            retry_count: 0,
            max_retries: 3,
            sequence: 0,
        }
    }

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        let policy = RetryPolicy {
            base: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
        };
        assert_eq!(policy.backoff_for(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(10), Duration::from_secs(1));
    }

    #[test]
    fn higher_priority_task_orders_before_lower() {
        let mut low = task("low");
        low.priority = 1;
        low.sequence = 0;
        let mut high = task("high");
        high.priority = 5;
        high.sequence = 1;
        assert!(high > low);
    }

    #[tokio::test]
    async fn pool_executes_submitted_task() {
        let worker = Arc::new(CountingWorker {
            calls: AtomicUsize::new(0),
            fail_first: false,
        });
        let pool = WorkerPool::new(
            worker.clone(),
            WorkerConfig {
                shutdown_grace_period: Duration::from_millis(100),
                ..WorkerConfig::default()
            },
        );
        pool.submit(task("t1")).await.unwrap();
        let run = tokio::spawn(async move { pool.run().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = run.await;
        assert_eq!(worker.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pool_retries_retryable_failure() {
        let worker = Arc::new(CountingWorker {
            calls: AtomicUsize::new(0),
            fail_first: true,
        });
        let pool = Arc::new(WorkerPool::new(
            worker.clone(),
            WorkerConfig {
                concurrency: 1,
                shutdown_grace_period: Duration::from_millis(500),
                ..WorkerConfig::default()
            },
        ));
        pool.submit(task("t1")).await.unwrap();
        let pool_run = pool.clone();
        let run = tokio::spawn(async move { pool_run.run().await });
        tokio::time::sleep(Duration::from_millis(300)).await;
        let _ = run.await;
        assert!(worker.calls.load(Ordering::SeqCst) >= 2);
    }
}
