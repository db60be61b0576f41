//! Wires the rollback, pipeline, and temporal subsystems over in-memory
//! collaborators for one CLI invocation.
//!
//! A config is loaded, collaborators and managers are constructed from it,
//! and commands run against the assembled app. Nothing here dials out —
//! there is no gateway or graph database in scope, so each invocation
//! seeds its own in-memory knowledge graph rather than connecting to a
//! persistent one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use memento_collab::{InMemoryDatabase, InMemoryKnowledgeGraph, InMemorySessionManager};
use memento_config::MementoConfig;
use memento_core::{CanonicalValue, DiffEntry, PathSegment};
use memento_pipeline::{BatchConfig, QueueConfig, WorkerConfig};
use memento_rollback::{DiffTarget, RollbackConfig, RollbackManager, RollbackStore, StoreConfig};
use memento_snapshot::SnapshotStore;
use memento_temporal::{PerfThresholds, TemporalTracker};
use parking_lot::RwLock;

/// An in-memory [`DiffTarget`] over a single [`CanonicalValue`] tree.
///
/// Mirrors `memento_rollback::strategy::test_support::TreeTarget`, which
/// is private to that crate's test build — commands here need their own
/// concrete target to drive `RollbackManager::rollback` end to end.
pub struct TreeTarget {
    tree: RwLock<CanonicalValue>,
}

impl TreeTarget {
    /// Builds a target seeded with `tree`.
    #[must_use]
    pub fn new(tree: CanonicalValue) -> Self {
        Self {
            tree: RwLock::new(tree),
        }
    }

    /// The tree's current contents.
    #[must_use]
    pub fn snapshot(&self) -> CanonicalValue {
        self.tree.read().clone()
    }
}

#[async_trait]
impl DiffTarget for TreeTarget {
    async fn current_value(
        &self,
        path: &[PathSegment],
    ) -> memento_rollback::Result<Option<CanonicalValue>> {
        let tree = self.tree.read();
        Ok(navigate(&tree, path))
    }

    async fn apply_entry(&self, entry: &DiffEntry) -> memento_rollback::Result<()> {
        let mut tree = self.tree.write();
        memento_core::apply_diff(&mut tree, std::slice::from_ref(entry)).map_err(Into::into)
    }

    async fn capture_backup(&self) -> memento_rollback::Result<CanonicalValue> {
        Ok(self.tree.read().clone())
    }

    async fn restore_backup(&self, backup: &CanonicalValue) -> memento_rollback::Result<()> {
        *self.tree.write() = backup.clone();
        Ok(())
    }
}

fn navigate(root: &CanonicalValue, path: &[PathSegment]) -> Option<CanonicalValue> {
    let mut current = root;
    for segment in path {
        current = match (segment, current) {
            (PathSegment::Key(key), CanonicalValue::Object(map))
            | (PathSegment::Key(key), CanonicalValue::Map(map)) => map.get(key)?,
            (PathSegment::Index(index), CanonicalValue::Array(items))
            | (PathSegment::Index(index), CanonicalValue::Set(items)) => items.get(*index)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

/// Assembled in-memory collaborators and subsystem managers for one CLI
/// invocation.
pub struct App {
    /// The resolved configuration this app was built from.
    pub config: MementoConfig,
    /// The demo knowledge graph every command operates against.
    pub graph: Arc<InMemoryKnowledgeGraph>,
    /// The demo database-readiness collaborator.
    pub database: Arc<InMemoryDatabase>,
    /// The demo session manager.
    pub sessions: Arc<InMemorySessionManager>,
    /// The rollback manager, wired over the graph/database/session
    /// collaborators and a [`TreeTarget`].
    pub rollback: RollbackManager,
    /// The temporal test-relationship tracker, wired over the same
    /// graph collaborator.
    pub tracker: TemporalTracker,
}

impl App {
    /// Assembles a fresh app from `config`.
    #[must_use]
    pub fn new(config: MementoConfig) -> Self {
        let graph = Arc::new(InMemoryKnowledgeGraph::new());
        let database = Arc::new(InMemoryDatabase::default());
        let sessions = Arc::new(InMemorySessionManager::new());

        let store = RollbackStore::new(StoreConfig {
            max_items: config.rollback.max_rollback_points,
            default_ttl: config.rollback.default_ttl(),
            cleanup_interval: config.rollback.cleanup_interval(),
        });
        let snapshots = SnapshotStore::new(config.rollback.max_snapshot_size);
        let target: Arc<dyn DiffTarget> =
            Arc::new(TreeTarget::new(CanonicalValue::Array(Vec::new())));
        let rollback = RollbackManager::new(
            store,
            snapshots,
            graph.clone(),
            sessions.clone(),
            database.clone(),
            None,
            target,
            RollbackConfig {
                require_database_ready: config.rollback.require_database_ready,
                capture_hops: config.incident.hops,
            },
        );

        let thresholds = PerfThresholds {
            p95_impact_ms: config.temporal.p95_impact_ms,
            avg_impact_ms: config.temporal.avg_impact_ms,
            degrading_min_delta_ms: config.temporal.degrading_min_delta_ms,
            trend_min_runs: config.temporal.trend_min_runs,
            min_history: config.temporal.min_history,
        };
        let tracker = TemporalTracker::new(graph.clone(), thresholds);

        Self {
            config,
            graph,
            database,
            sessions,
            rollback,
            tracker,
        }
    }

    /// Builds the event queue configuration this app's config names.
    #[must_use]
    pub fn queue_config(&self) -> QueueConfig {
        let queues = &self.config.pipeline.queues;
        QueueConfig {
            partition_count: self.config.pipeline.event_bus.partitions.max(queues.partition_count),
            max_size: queues.max_size,
            partition_capacity: queues.batch_size.max(1),
        }
    }

    /// Builds the worker pool configuration this app's config names.
    #[must_use]
    pub fn worker_config(&self) -> WorkerConfig {
        let workers = &self.config.pipeline.workers;
        WorkerConfig {
            concurrency: workers.entity_workers.max(1),
            task_timeout: Duration::from_millis(self.config.pipeline.queues.batch_timeout_ms.max(1)),
            shutdown_grace_period: Duration::from_millis(300),
        }
    }

    /// Builds the batch coordinator configuration this app's config names.
    #[must_use]
    pub fn batch_config(&self) -> BatchConfig {
        let batching = &self.config.pipeline.batching;
        BatchConfig {
            entity_batch_size: batching.entity_batch_size,
            relationship_batch_size: batching.relationship_batch_size,
            embedding_batch_size: batching.embedding_batch_size,
            timeout: Duration::from_millis(batching.timeout_ms),
            idempotency_key_ttl: Duration::from_millis(
                batching.idempotency_ttl_ms.unwrap_or(10 * 60 * 1000),
            ),
            max_attempts: batching.max_attempts,
            backoff_multiplier: batching.backoff_multiplier,
            max_backoff: Duration::from_millis(batching.max_backoff_ms),
        }
    }
}
