//! Knowledge-graph collaborator contract.
//!
//! The core never talks to the graph database directly: every read and
//! write goes through this trait, so the rollback, pipeline, and temporal
//! subsystems can be exercised against an in-memory double in tests.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use memento_core::{Entity, EntityId, Relationship, RelationshipId};
use parking_lot::RwLock;

use crate::error::Result;

/// Filters over the relationship set, used by [`KnowledgeGraphService::get_relationships`]
/// and [`KnowledgeGraphService::query_relationships`].
#[derive(Debug, Clone, Default)]
pub struct RelationshipQuery {
    /// Restrict to relationships from this entity.
    pub from_entity_id: Option<EntityId>,
    /// Restrict to relationships to this entity.
    pub to_entity_id: Option<EntityId>,
    /// Restrict to relationships whose canonical type name matches.
    pub type_name: Option<String>,
    /// Restrict to relationships owned by this session.
    pub session_id: Option<String>,
    /// Cap the number of results returned.
    pub limit: Option<usize>,
}

/// Whether [`KnowledgeGraphService::create_relationships_bulk`] validates
/// each relationship before writing it.
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkWriteOptions {
    /// When `true`, reject the whole batch if any relationship fails basic
    /// shape validation (non-empty endpoints).
    pub validate: bool,
}

/// Outcome of a bulk relationship write: which relationships were written
/// (deduplicated by canonical ID against what the graph already held) and
/// which were rejected.
#[derive(Debug, Clone, Default)]
pub struct BulkWriteResult {
    /// IDs that were newly written or idempotently matched an existing
    /// relationship.
    pub written: Vec<RelationshipId>,
    /// Relationships rejected during validation, paired with the reason.
    pub rejected: Vec<(RelationshipId, String)>,
}

/// How far a checkpoint expands from its seed entities, and which kind of
/// checkpoint it represents.
#[derive(Debug, Clone)]
pub struct CheckpointRequest {
    /// The checkpoint's discriminator (e.g. `"incident"`).
    pub checkpoint_type: String,
    /// Number of relationship hops to expand from the seeds, `1..=5`.
    pub hops: u8,
}

/// The entities a checkpoint request resolves to: the seeds plus every
/// entity reachable within `hops` relationship traversals.
#[derive(Debug, Clone, Default)]
pub struct CheckpointResult {
    /// The full set of entity IDs the checkpoint should snapshot,
    /// including the original seeds.
    pub entity_ids: Vec<EntityId>,
}

/// Contract for the knowledge-graph collaborator.
///
/// This crate's in-memory reference implementation, [`InMemoryKnowledgeGraph`],
/// is suitable for tests and for local exercise of the pipeline and
/// rollback managers; production deployments supply a graph-database-backed
/// implementation out of scope for this crate.
#[async_trait]
pub trait KnowledgeGraphService: Send + Sync {
    /// Fetches a single entity by ID.
    async fn get_entity(&self, id: &EntityId) -> Result<Option<Entity>>;

    /// Fetches every entity currently in the graph.
    async fn get_entities(&self) -> Result<Vec<Entity>>;

    /// Fetches relationships matching `query`.
    async fn get_relationships(&self, query: &RelationshipQuery) -> Result<Vec<Relationship>>;

    /// An alias for [`Self::get_relationships`] kept distinct because the
    /// source API exposes both a direct accessor and a query-builder
    /// entrypoint; both read the same underlying store.
    async fn query_relationships(&self, query: &RelationshipQuery) -> Result<Vec<Relationship>> {
        self.get_relationships(query).await
    }

    /// Inserts a new entity, erroring if one with the same ID already
    /// exists.
    async fn create_entity(&self, entity: Entity) -> Result<()>;

    /// Inserts or replaces an entity by ID.
    async fn create_or_update_entity(&self, entity: Entity) -> Result<()>;

    /// Writes a single relationship, keyed by its canonical ID. Writing the
    /// same canonical ID twice is a no-op on the second write.
    async fn create_relationship(&self, relationship: Relationship) -> Result<()>;

    /// Writes a batch of relationships idempotently, keyed by canonical ID.
    async fn create_relationships_bulk(
        &self,
        relationships: Vec<Relationship>,
        options: BulkWriteOptions,
    ) -> Result<BulkWriteResult>;

    /// Resolves a checkpoint request's seed entity IDs, expanded by
    /// relationship hops, into the full set of entities an incident
    /// checkpoint should snapshot.
    async fn create_checkpoint(
        &self,
        seed_ids: Vec<EntityId>,
        request: CheckpointRequest,
    ) -> Result<CheckpointResult>;
}

struct Inner {
    entities: indexmap::IndexMap<EntityId, Entity>,
    relationships: indexmap::IndexMap<RelationshipId, Relationship>,
}

/// An in-memory [`KnowledgeGraphService`], used by tests and local
/// exercise of the rollback/pipeline/temporal managers.
pub struct InMemoryKnowledgeGraph {
    inner: RwLock<Inner>,
}

impl Default for InMemoryKnowledgeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryKnowledgeGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                entities: indexmap::IndexMap::new(),
                relationships: indexmap::IndexMap::new(),
            }),
        }
    }

    fn matches(relationship: &Relationship, query: &RelationshipQuery) -> bool {
        if let Some(from) = &query.from_entity_id {
            if &relationship.from_entity_id != from {
                return false;
            }
        }
        if let Some(to) = &query.to_entity_id {
            if &relationship.to_entity_id != to {
                return false;
            }
        }
        if let Some(type_name) = &query.type_name {
            if &relationship.relation_type.canonical_name() != type_name {
                return false;
            }
        }
        if let Some(session_id) = &query.session_id {
            if relationship.session_id.as_deref() != Some(session_id.as_str()) {
                return false;
            }
        }
        true
    }

    fn validate_relationship(relationship: &Relationship) -> std::result::Result<(), String> {
        if relationship.from_entity_id.as_str().is_empty() {
            return Err("from_entity_id is empty".to_string());
        }
        if relationship.to_entity_id.as_str().is_empty() && relationship.to_ref.is_none() {
            return Err("to_entity_id and to_ref are both empty".to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl KnowledgeGraphService for InMemoryKnowledgeGraph {
    async fn get_entity(&self, id: &EntityId) -> Result<Option<Entity>> {
        Ok(self.inner.read().entities.get(id).cloned())
    }

    async fn get_entities(&self) -> Result<Vec<Entity>> {
        Ok(self.inner.read().entities.values().cloned().collect())
    }

    async fn get_relationships(&self, query: &RelationshipQuery) -> Result<Vec<Relationship>> {
        let inner = self.inner.read();
        let mut matched: Vec<Relationship> = inner
            .relationships
            .values()
            .filter(|r| Self::matches(r, query))
            .cloned()
            .collect();
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn create_entity(&self, entity: Entity) -> Result<()> {
        let mut inner = self.inner.write();
        inner.entities.insert(entity.id.clone(), entity);
        Ok(())
    }

    async fn create_or_update_entity(&self, entity: Entity) -> Result<()> {
        let mut inner = self.inner.write();
        inner.entities.insert(entity.id.clone(), entity);
        Ok(())
    }

    async fn create_relationship(&self, relationship: Relationship) -> Result<()> {
        let mut inner = self.inner.write();
        inner
            .relationships
            .entry(relationship.id.clone())
            .or_insert(relationship);
        Ok(())
    }

    async fn create_relationships_bulk(
        &self,
        relationships: Vec<Relationship>,
        options: BulkWriteOptions,
    ) -> Result<BulkWriteResult> {
        let mut result = BulkWriteResult::default();
        let mut inner = self.inner.write();
        for relationship in relationships {
            if options.validate {
                if let Err(reason) = Self::validate_relationship(&relationship) {
                    result.rejected.push((relationship.id.clone(), reason));
                    continue;
                }
            }
            let id = relationship.id.clone();
            inner.relationships.entry(id.clone()).or_insert(relationship);
            result.written.push(id);
        }
        Ok(result)
    }

    async fn create_checkpoint(
        &self,
        seed_ids: Vec<EntityId>,
        request: CheckpointRequest,
    ) -> Result<CheckpointResult> {
        let hops = request.hops.clamp(1, 5);
        let inner = self.inner.read();
        let mut visited: HashSet<EntityId> = seed_ids.iter().cloned().collect();
        let mut frontier: VecDeque<(EntityId, u8)> =
            seed_ids.into_iter().map(|id| (id, 0)).collect();

        while let Some((id, depth)) = frontier.pop_front() {
            if depth >= hops {
                continue;
            }
            for relationship in inner.relationships.values() {
                let neighbor = if relationship.from_entity_id == id {
                    Some(relationship.to_entity_id.clone())
                } else if relationship.to_entity_id == id {
                    Some(relationship.from_entity_id.clone())
                } else {
                    None
                };
                if let Some(neighbor) = neighbor {
                    if visited.insert(neighbor.clone()) {
                        frontier.push_back((neighbor, depth + 1));
                    }
                }
            }
        }

        Ok(CheckpointResult {
            entity_ids: visited.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use memento_core::{CodeRelationKind, RelationshipType};

    fn entity(id: &str) -> Entity {
        Entity::new(EntityId::new(id), "function", "h", Utc::now())
    }

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

    #[tokio::test]
    async fn create_relationship_is_idempotent_on_canonical_id() {
        let graph = InMemoryKnowledgeGraph::new();
        let rel = relationship("a", "b");
        graph.create_relationship(rel.clone()).await.unwrap();
        graph.create_relationship(rel).await.unwrap();
        let all = graph
            .get_relationships(&RelationshipQuery::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn bulk_write_validation_rejects_empty_endpoints() {
        let graph = InMemoryKnowledgeGraph::new();
        let mut bad = relationship("", "b");
        bad.id = RelationshipId::from_raw("bad");
        let result = graph
            .create_relationships_bulk(vec![bad], BulkWriteOptions { validate: true })
            .await
            .unwrap();
        assert!(result.written.is_empty());
        assert_eq!(result.rejected.len(), 1);
    }

    #[tokio::test]
    async fn checkpoint_expands_by_hops() {
        let graph = InMemoryKnowledgeGraph::new();
        graph.create_entity(entity("a")).await.unwrap();
        graph.create_entity(entity("b")).await.unwrap();
        graph.create_entity(entity("c")).await.unwrap();
        graph.create_relationship(relationship("a", "b")).await.unwrap();
        graph.create_relationship(relationship("b", "c")).await.unwrap();

        let result = graph
            .create_checkpoint(
                vec![EntityId::new("a")],
                CheckpointRequest {
                    checkpoint_type: "incident".to_string(),
                    hops: 1,
                },
            )
            .await
            .unwrap();
        assert!(result.entity_ids.contains(&EntityId::new("a")));
        assert!(result.entity_ids.contains(&EntityId::new("b")));
        assert!(!result.entity_ids.contains(&EntityId::new("c")));

        let result2 = graph
            .create_checkpoint(
                vec![EntityId::new("a")],
                CheckpointRequest {
                    checkpoint_type: "incident".to_string(),
                    hops: 2,
                },
            )
            .await
            .unwrap();
        assert!(result2.entity_ids.contains(&EntityId::new("c")));
    }
}
