//! Orchestrates rollback-point creation, diffing, and restore execution.
//!
//! The manager owns a [`RollbackStore`], a [`SnapshotStore`], and the
//! collaborator handles needed to capture and replay state, and picks a
//! [`RollbackStrategy`] by diff size and point age.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use memento_collab::{
    CheckpointRequest, DatabaseService, FileSystemService, KnowledgeGraphService,
    RelationshipQuery, SessionManager,
};
use memento_core::{CanonicalValue, DiffOptions};
use memento_snapshot::{diff_snapshots, RollbackPointId, SnapshotStore};

use crate::conflict::{ConflictResolver, ConflictStrategy};
use crate::error::{Result, RollbackError};
use crate::store::RollbackStore;
use crate::strategy::{
    DiffTarget, ForceStrategy, GradualStrategy, ImmediateStrategy, RollbackStrategy, SafeStrategy,
    StrategyContext,
};
use crate::types::{OperationId, OperationStatus, OperationType, RollbackOperation, StrategyKind};

/// Diff length at or below which [`StrategyKind::Immediate`] is chosen
/// over a size-driven alternative.
const SMALL_DIFF_THRESHOLD: usize = 5;
/// Diff length above which [`StrategyKind::Gradual`] is preferred, absent
/// an age-driven reason to go [`StrategyKind::Safe`] instead.
const LARGE_DIFF_THRESHOLD: usize = 50;
/// Rollback-point age past which [`StrategyKind::Safe`] is preferred.
const SAFE_AGE_THRESHOLD: chrono::Duration = chrono::Duration::hours(24);

/// Options controlling how [`RollbackManager::rollback`] resolves
/// conflicts and picks a strategy.
#[derive(Clone)]
pub struct RollbackOptions {
    /// Restore every snapshot, or only a caller-selected subset.
    pub op_type: OperationType,
    /// Forces a specific strategy instead of the size/age heuristic.
    pub strategy_override: Option<StrategyKind>,
    /// How to resolve conflicts detected during apply.
    pub conflict_strategy: ConflictStrategy,
    /// Resolver consulted under [`ConflictStrategy::AskUser`].
    pub resolver: Option<Arc<dyn ConflictResolver>>,
}

impl Default for RollbackOptions {
    fn default() -> Self {
        Self {
            op_type: OperationType::Full,
            strategy_override: None,
            conflict_strategy: ConflictStrategy::Abort,
            resolver: None,
        }
    }
}

/// Configuration gating rollback-point creation.
#[derive(Debug, Clone, Default)]
pub struct RollbackConfig {
    /// When `true`, creating a rollback point first checks
    /// [`DatabaseService::is_ready`] and fails with
    /// [`RollbackError::DatabaseNotReady`] if it returns `false`.
    pub require_database_ready: bool,
    /// Number of relationship hops captured alongside entity/relationship
    /// state, reusing the knowledge graph's checkpoint expansion.
    pub capture_hops: u8,
}

/// Orchestrates the rollback subsystem's collaborators, store, and
/// strategies.
pub struct RollbackManager {
    store: RollbackStore,
    snapshots: SnapshotStore,
    graph: Arc<dyn KnowledgeGraphService>,
    sessions: Arc<dyn SessionManager>,
    database: Arc<dyn DatabaseService>,
    filesystem: Option<Arc<dyn FileSystemService>>,
    target: Arc<dyn DiffTarget>,
    config: RollbackConfig,
}

impl RollbackManager {
    /// Assembles a manager over the given store, snapshot store, and
    /// collaborators.
    #[must_use]
    pub fn new(
        store: RollbackStore,
        snapshots: SnapshotStore,
        graph: Arc<dyn KnowledgeGraphService>,
        sessions: Arc<dyn SessionManager>,
        database: Arc<dyn DatabaseService>,
        filesystem: Option<Arc<dyn FileSystemService>>,
        target: Arc<dyn DiffTarget>,
        config: RollbackConfig,
    ) -> Self {
        Self {
            store,
            snapshots,
            graph,
            sessions,
            database,
            filesystem,
            target,
            config,
        }
    }

    /// The underlying rollback-point/operation store, for callers that
    /// need to subscribe to lifecycle events or run periodic cleanup.
    #[must_use]
    pub const fn store(&self) -> &RollbackStore {
        &self.store
    }

    async fn capture_snapshots(
        &self,
        point_id: &RollbackPointId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let entities = self
            .graph
            .get_entities()
            .await
            .map_err(|e| RollbackError::Collaborator {
                reason: e.to_string(),
            })?;
        let entities_json =
            serde_json::to_value(&entities).map_err(|e| RollbackError::Collaborator {
                reason: e.to_string(),
            })?;
        self.snapshots.create(
            point_id.clone(),
            "entity",
            CanonicalValue::from_json(&entities_json),
            now,
        )?;

        let relationships = self
            .graph
            .get_relationships(&RelationshipQuery::default())
            .await
            .map_err(|e| RollbackError::Collaborator {
                reason: e.to_string(),
            })?;
        let relationships_json =
            serde_json::to_value(&relationships).map_err(|e| RollbackError::Collaborator {
                reason: e.to_string(),
            })?;
        self.snapshots.create(
            point_id.clone(),
            "relationship",
            CanonicalValue::from_json(&relationships_json),
            now,
        )?;

        if let Some(session_id) = self.sessions.get_current_session_id().await {
            if let Ok(data) = self.sessions.get_session_data(&session_id).await {
                self.snapshots.create(
                    point_id.clone(),
                    "session_state",
                    CanonicalValue::from_json(&data),
                    now,
                )?;
            }
        }

        if let Some(filesystem) = &self.filesystem {
            let data = filesystem
                .capture()
                .await
                .map_err(|e| RollbackError::Collaborator {
                    reason: e.to_string(),
                })?;
            self.snapshots
                .create(point_id.clone(), "file_system", data, now)?;
        }

        Ok(())
    }

    /// Creates a rollback point, capturing entity, relationship, session,
    /// and (if configured) file-system snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`RollbackError::DatabaseNotReady`] if
    /// [`RollbackConfig::require_database_ready`] is set and the database
    /// collaborator reports not-ready, or any snapshot/collaborator
    /// error encountered while capturing state.
    pub async fn create_point(
        &self,
        id: RollbackPointId,
        name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<crate::types::RollbackPoint> {
        if self.config.require_database_ready && !self.database.is_ready().await {
            return Err(RollbackError::DatabaseNotReady);
        }

        self.capture_snapshots(&id, now).await?;

        let session_id = self.sessions.get_current_session_id().await;
        let mut point = crate::types::RollbackPoint::new(id, name, now);
        if let Some(session_id) = session_id {
            point = point.with_session_id(session_id);
        }
        self.store.put_point(point.clone());
        Ok(point)
    }

    /// Computes the diff between the current graph state and a rollback
    /// point's captured snapshots, pairing each by `snapshot_type`.
    ///
    /// # Errors
    ///
    /// Returns [`RollbackError::RollbackPointNotFound`]/`Expired` if the
    /// point cannot be read, or [`RollbackError::NoSnapshotsFound`] if it
    /// has no snapshots.
    pub async fn generate_diff(
        &self,
        point_id: &RollbackPointId,
        now: DateTime<Utc>,
    ) -> Result<Vec<memento_core::DiffEntry>> {
        let point = self.store.get_point(point_id, now)?;
        let target_ids = self.snapshots.snapshot_ids_for_point(&point.id);
        if target_ids.is_empty() {
            return Err(RollbackError::NoSnapshotsFound {
                id: point_id.to_string(),
            });
        }

        let temp_id = RollbackPointId::new(format!("__diff-temp-{}", point.id.as_str()));
        self.capture_snapshots(&temp_id, now).await?;
        let current_ids = self.snapshots.snapshot_ids_for_point(&temp_id);

        let mut entries = Vec::new();
        let options = DiffOptions::default();
        for target_snapshot_id in &target_ids {
            let target_snapshot = self.snapshots.get(target_snapshot_id)?;
            let Some(current_snapshot_id) = current_ids.iter().find_map(|id| {
                let snapshot = self.snapshots.get(id).ok()?;
                (snapshot.snapshot_type == target_snapshot.snapshot_type).then_some(id.clone())
            }) else {
                continue;
            };
            let current_snapshot = self.snapshots.get(&current_snapshot_id)?;
            entries.extend(diff_snapshots(&current_snapshot, &target_snapshot, &options)?);
        }

        self.snapshots.delete_for_point(&temp_id);
        Ok(entries)
    }

    fn recommend_strategy(
        &self,
        diff_len: usize,
        point_age: chrono::Duration,
    ) -> Arc<dyn RollbackStrategy> {
        if point_age > SAFE_AGE_THRESHOLD {
            Arc::new(SafeStrategy::default())
        } else if diff_len <= SMALL_DIFF_THRESHOLD {
            Arc::new(ImmediateStrategy::default())
        } else if diff_len > LARGE_DIFF_THRESHOLD {
            Arc::new(GradualStrategy::default())
        } else {
            Arc::new(ImmediateStrategy::default())
        }
    }

    fn strategy_for(
        &self,
        kind: StrategyKind,
    ) -> Arc<dyn RollbackStrategy> {
        match kind {
            StrategyKind::Immediate => Arc::new(ImmediateStrategy::default()),
            StrategyKind::Gradual => Arc::new(GradualStrategy::default()),
            StrategyKind::Safe => Arc::new(SafeStrategy::default()),
            StrategyKind::Force => Arc::new(ForceStrategy),
        }
    }

    /// Creates and executes a rollback operation against `point_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RollbackError::StrategyValidationFailed`] if the chosen
    /// (or overridden) strategy rejects the context, [`RollbackError::Conflict`]
    /// if conflicts are detected under [`ConflictStrategy::Abort`], or any
    /// error surfaced while generating the diff or applying it.
    pub async fn rollback(
        &self,
        point_id: &RollbackPointId,
        options: RollbackOptions,
        now: DateTime<Utc>,
    ) -> Result<RollbackOperation> {
        let point = self.store.get_point(point_id, now)?;
        let diff = self.generate_diff(point_id, now).await?;

        let strategy = match options.strategy_override {
            Some(kind) => self.strategy_for(kind),
            None => self.recommend_strategy(diff.len(), point.age(now)),
        };

        let ctx = StrategyContext {
            diff,
            rollback_point_timestamp: point.timestamp,
            conflict_strategy: options.conflict_strategy,
            resolver: options.resolver,
            now,
        };

        if !strategy.validate(&ctx) {
            return Err(RollbackError::StrategyValidationFailed {
                reason: format!("{} strategy rejected this rollback context", strategy.kind()),
            });
        }

        let mut operation =
            RollbackOperation::new(options.op_type, point.id.clone(), strategy.kind(), now);
        operation.start();
        self.store.put_operation(operation.clone());

        let result = strategy.execute(self.target.as_ref(), &ctx, &mut operation).await;
        match result {
            Ok(()) => operation.finish(OperationStatus::Completed, now),
            Err(_) => operation.finish(OperationStatus::Failed, now),
        }
        self.store.put_operation(operation.clone());
        result.map(|()| operation)
    }

    /// Cancels an in-progress operation.
    ///
    /// # Errors
    ///
    /// Returns [`RollbackError::OperationNotFound`] if no such operation
    /// exists, or [`RollbackError::OperationNotCancellable`] if it is not
    /// currently `InProgress`.
    pub fn cancel(&self, operation_id: &OperationId, now: DateTime<Utc>) -> Result<RollbackOperation> {
        let mut operation = self.store.get_operation(operation_id).ok_or_else(|| {
            RollbackError::OperationNotFound {
                id: operation_id.to_string(),
            }
        })?;
        if operation.status != OperationStatus::InProgress {
            return Err(RollbackError::OperationNotCancellable {
                id: operation_id.to_string(),
                status: operation.status.to_string(),
            });
        }
        operation.finish(OperationStatus::Cancelled, now);
        self.store.put_operation(operation.clone());
        Ok(operation)
    }

    /// Deletes a rollback point and its snapshots. Idempotent: deleting a
    /// point that does not exist is not an error.
    pub fn delete(&self, point_id: &RollbackPointId) {
        self.snapshots.delete_for_point(point_id);
        self.store.remove_point(point_id);
    }

    /// Resolves a checkpoint request's seed entities into the full set an
    /// incident checkpoint should snapshot, by delegating to the
    /// knowledge-graph collaborator's hop expansion.
    ///
    /// # Errors
    ///
    /// Returns [`RollbackError::Collaborator`] if the graph collaborator
    /// call fails.
    pub async fn expand_checkpoint(
        &self,
        seed_ids: Vec<memento_core::EntityId>,
        checkpoint_type: impl Into<String>,
        hops: u8,
    ) -> Result<Vec<memento_core::EntityId>> {
        let result = self
            .graph
            .create_checkpoint(
                seed_ids,
                CheckpointRequest {
                    checkpoint_type: checkpoint_type.into(),
                    hops: hops.clamp(1, 5),
                },
            )
            .await
            .map_err(|e| RollbackError::Collaborator {
                reason: e.to_string(),
            })?;
        Ok(result.entity_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreConfig;
    use crate::strategy::test_support::TreeTarget;
    use chrono::Utc;
    use memento_collab::{InMemoryDatabase, InMemoryKnowledgeGraph, InMemorySessionManager};
    use memento_core::{CodeRelationKind, Entity, EntityId, Relationship, RelationshipId, RelationshipType};

    fn relationship(from: &str, to: &str) -> Relationship {
        Relationship {
            id: RelationshipId::from_raw(format!("rel-{from}-{to}")),
            from_entity_id: EntityId::new(from),
            to_entity_id: EntityId::new(to),
            to_ref: None,
            relation_type: RelationshipType::Code(CodeRelationKind::Calls),
            created: Utc::now(),
            last_modified: Utc::now(),
            version: 1,
            metadata: std::collections::HashMap::new(),
            session_id: None,
            sequence_number: None,
            metric_id: None,
            environment: None,
            scenario: None,
            qualifiers: Vec::new(),
        }
    }

    fn manager() -> RollbackManager {
        let graph = Arc::new(InMemoryKnowledgeGraph::new());
        RollbackManager::new(
            RollbackStore::new(StoreConfig::default()),
            SnapshotStore::new(1024 * 1024),
            graph,
            Arc::new(InMemorySessionManager::new()),
            Arc::new(InMemoryDatabase::default()),
            None,
            Arc::new(TreeTarget::new(CanonicalValue::Null)),
            RollbackConfig::default(),
        )
    }

    #[tokio::test]
    async fn create_point_fails_when_database_not_ready() {
        let graph = Arc::new(InMemoryKnowledgeGraph::new());
        let manager = RollbackManager::new(
            RollbackStore::new(StoreConfig::default()),
            SnapshotStore::new(1024 * 1024),
            graph,
            Arc::new(InMemorySessionManager::new()),
            Arc::new(InMemoryDatabase::new(false)),
            None,
            Arc::new(TreeTarget::new(CanonicalValue::Null)),
            RollbackConfig {
                require_database_ready: true,
                capture_hops: 1,
            },
        );
        let result = manager
            .create_point(RollbackPointId::new("p1"), "p1", Utc::now())
            .await;
        assert!(matches!(result, Err(RollbackError::DatabaseNotReady)));
    }

    #[tokio::test]
    async fn create_point_captures_entity_and_relationship_snapshots() {
        let manager = manager();
        let now = Utc::now();
        manager
            .graph
            .create_entity(Entity::new(EntityId::new("e1"), "function", "h", now))
            .await
            .unwrap();
        manager
            .graph
            .create_relationship(relationship("e1", "e2"))
            .await
            .unwrap();

        let point = manager
            .create_point(RollbackPointId::new("p1"), "p1", now)
            .await
            .unwrap();
        let snapshot_ids = manager.snapshots.snapshot_ids_for_point(&point.id);
        assert_eq!(snapshot_ids.len(), 2);
    }

    #[tokio::test]
    async fn generate_diff_errors_without_snapshots() {
        let manager = manager();
        let result = manager
            .generate_diff(&RollbackPointId::new("missing"), Utc::now())
            .await;
        assert!(matches!(result, Err(RollbackError::RollbackPointNotFound { .. })));
    }

    #[tokio::test]
    async fn rollback_round_trips_through_immediate_strategy() {
        let graph = Arc::new(InMemoryKnowledgeGraph::new());
        let manager = RollbackManager::new(
            RollbackStore::new(StoreConfig::default()),
            SnapshotStore::new(1024 * 1024),
            graph,
            Arc::new(InMemorySessionManager::new()),
            Arc::new(InMemoryDatabase::default()),
            None,
            // The diff this test exercises targets newly appended array
            // entries, which apply cleanly against any array target
            // regardless of its starting contents.
            Arc::new(TreeTarget::new(CanonicalValue::Array(Vec::new()))),
            RollbackConfig::default(),
        );
        let now = Utc::now();
        manager
            .graph
            .create_entity(Entity::new(EntityId::new("e1"), "function", "h", now))
            .await
            .unwrap();
        let point = manager
            .create_point(RollbackPointId::new("p1"), "p1", now)
            .await
            .unwrap();

        manager
            .graph
            .create_entity(Entity::new(EntityId::new("e2"), "function", "h", now))
            .await
            .unwrap();

        let operation = manager
            .rollback(&point.id, RollbackOptions::default(), now)
            .await
            .unwrap();
        assert_eq!(operation.status, OperationStatus::Completed);
    }

    #[test]
    fn cancel_rejects_non_in_progress_operation() {
        let manager = manager();
        let operation = RollbackOperation::new(
            OperationType::Full,
            RollbackPointId::new("p1"),
            StrategyKind::Immediate,
            Utc::now(),
        );
        let id = operation.id.clone();
        manager.store.put_operation(operation);
        let result = manager.cancel(&id, Utc::now());
        assert!(matches!(
            result,
            Err(RollbackError::OperationNotCancellable { .. })
        ));
    }
}
