//! Entities and relationships: the nodes and edges of the knowledge graph.
//!
//! Relationship identity is never assigned by a caller; see [`crate::identity`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique, externally assigned identifier for a graph entity.
///
/// Uniqueness is an invariant the graph layer (out of scope for this crate)
/// must enforce; this type only prevents mixing an entity ID up with a
/// relationship ID or a bare path string at the type level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    /// Wraps a raw identifier string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Derived, never user-supplied, identifier for a relationship.
///
/// Computed by [`crate::identity::canonical_relationship_id`]; two edges
/// with the same family-specific tuple always hash to the same
/// `RelationshipId`, which is what makes graph writes idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipId(String);

impl RelationshipId {
    /// Wraps an already-computed ID string. Prefer
    /// [`crate::identity::canonical_relationship_id`] over calling this
    /// directly.
    #[must_use]
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A directed edge's resolved target, preferred over parsing the raw
/// `toEntityId` when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetRef {
    /// A file-scoped symbol: `FS:<file>:<symbol>`.
    Fs {
        /// File path.
        file: String,
        /// Symbol name within the file.
        symbol: String,
    },
    /// An external (non-project) name: `EXT:<name>`.
    Ext {
        /// The external name.
        name: String,
    },
    /// A kind-qualified name: `KIND:<kind>:<name>`.
    Kind {
        /// The kind discriminator (e.g. "class", "interface").
        kind: String,
        /// The name within that kind.
        name: String,
    },
    /// An imported-module-qualified name: `IMP:<module>:<name>`.
    Imp {
        /// The module the name was imported from.
        module: String,
        /// The imported name.
        name: String,
    },
    /// A direct entity reference: `ENT:<id>`.
    Ent {
        /// The referenced entity ID.
        id: String,
    },
    /// An opaque fallback: `RAW:<raw>`.
    Raw {
        /// The raw string that could not be resolved more specifically.
        raw: String,
    },
}

impl TargetRef {
    /// Renders the canonical target key used inside relationship ID bases.
    #[must_use]
    pub fn canonical_key(&self) -> String {
        match self {
            Self::Fs { file, symbol } => format!("FS:{file}:{symbol}"),
            Self::Ext { name } => format!("EXT:{name}"),
            Self::Kind { kind, name } => format!("KIND:{kind}:{name}"),
            Self::Imp { module, name } => format!("IMP:{module}:{name}"),
            Self::Ent { id } => format!("ENT:{id}"),
            Self::Raw { raw } => format!("RAW:{raw}"),
        }
    }
}

/// Code-family relationship kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeRelationKind {
    /// Function/method invocation.
    Calls,
    /// Generic symbol reference.
    References,
    /// Interface implementation.
    Implements,
    /// Type extension/inheritance.
    Extends,
    /// Module/package dependency.
    DependsOn,
    /// Usage of a type.
    TypeUses,
    /// Function return type.
    ReturnsType,
    /// Function parameter type.
    ParamType,
    /// Generic usage edge.
    Uses,
}

impl CodeRelationKind {
    /// The relationship type's stable name, used in ID hash bases.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Calls => "CALLS",
            Self::References => "REFERENCES",
            Self::Implements => "IMPLEMENTS",
            Self::Extends => "EXTENDS",
            Self::DependsOn => "DEPENDS_ON",
            Self::TypeUses => "TYPE_USES",
            Self::ReturnsType => "RETURNS_TYPE",
            Self::ParamType => "PARAM_TYPE",
            Self::Uses => "USES",
        }
    }
}

/// Session-family relationship kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionRelationKind {
    /// A discrete session event.
    SessionEvent,
    /// A session state snapshot.
    State,
    /// A session state transition.
    Transition,
    /// Contextual data attached to a session.
    Context,
}

impl SessionRelationKind {
    /// The relationship type's stable name, used in ID hash bases.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SessionEvent => "SESSION_EVENT",
            Self::State => "STATE",
            Self::Transition => "TRANSITION",
            Self::Context => "CONTEXT",
        }
    }
}

/// Performance-family relationship kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerformanceRelationKind {
    /// A detected performance impact.
    PerformanceImpact,
    /// A sustained performance regression.
    Regression,
    /// A raw performance metric sample.
    PerformanceMetric,
    /// A benchmark run.
    Benchmark,
    /// A profiling sample.
    Profile,
}

impl PerformanceRelationKind {
    /// The relationship type's stable name, used in ID hash bases.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PerformanceImpact => "PERFORMANCE_IMPACT",
            Self::Regression => "REGRESSION",
            Self::PerformanceMetric => "PERFORMANCE_METRIC",
            Self::Benchmark => "BENCHMARK",
            Self::Profile => "PROFILE",
        }
    }
}

/// Documentation-family relationship kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentationRelationKind {
    /// Describes a conceptual domain.
    DescribesDomain,
    /// Belongs to a conceptual domain.
    BelongsToDomain,
    /// Documents a code entity.
    Documents,
    /// Is documented by a doc entity.
    DocumentedBy,
}

impl DocumentationRelationKind {
    /// The relationship type's stable name, used in ID hash bases.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DescribesDomain => "DESCRIBES_DOMAIN",
            Self::BelongsToDomain => "BELONGS_TO_DOMAIN",
            Self::Documents => "DOCUMENTS",
            Self::DocumentedBy => "DOCUMENTED_BY",
        }
    }
}

/// Testing-family relationship kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestingRelationKind {
    /// A test exercises a code entity.
    Tests,
    /// A test validates a requirement or acceptance criterion.
    Validates,
    /// A test provides coverage for a code entity.
    CoverageProvides,
    /// A test started failing at this revision/entity.
    BrokeIn,
    /// A test started passing again at this revision/entity.
    FixedIn,
}

impl TestingRelationKind {
    /// The relationship type's stable name, used in ID hash bases.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tests => "TESTS",
            Self::Validates => "VALIDATES",
            Self::CoverageProvides => "COVERAGE_PROVIDES",
            Self::BrokeIn => "BROKE_IN",
            Self::FixedIn => "FIXED_IN",
        }
    }
}

/// The family a relationship belongs to, determining its ID hash base and
/// prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipFamily {
    /// Type-system edges.
    Structural,
    /// `CALLS`/`REFERENCES`/... and friends.
    Code,
    /// `SESSION_EVENT`/`STATE`/... and friends.
    Session,
    /// `PERFORMANCE_IMPACT`/`REGRESSION`/... and friends.
    Performance,
    /// `DESCRIBES_DOMAIN`/`DOCUMENTS`/... and friends.
    Documentation,
    /// `TESTS`/`BROKE_IN`/... and friends.
    Testing,
}

impl RelationshipFamily {
    /// The ID prefix this family uses.
    #[must_use]
    pub const fn id_prefix(self) -> &'static str {
        match self {
            Self::Structural => "time-rel_",
            Self::Session => "rel_session_",
            Self::Performance => "rel_perf_",
            Self::Code | Self::Documentation | Self::Testing => "rel_",
        }
    }
}

/// The full set of relationship type variants, grouped by family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    /// A type-system edge. The source data model does not enumerate
    /// structural kinds further; the string is the kind name (e.g.
    /// `"SUBTYPE_OF"`).
    Structural(String),
    /// A code-family relationship.
    Code(CodeRelationKind),
    /// A session-family relationship.
    Session(SessionRelationKind),
    /// A performance-family relationship.
    Performance(PerformanceRelationKind),
    /// A documentation-family relationship.
    Documentation(DocumentationRelationKind),
    /// A testing-family relationship.
    Testing(TestingRelationKind),
}

impl RelationshipType {
    /// Which family this relationship type belongs to.
    #[must_use]
    pub const fn family(&self) -> RelationshipFamily {
        match self {
            Self::Structural(_) => RelationshipFamily::Structural,
            Self::Code(_) => RelationshipFamily::Code,
            Self::Session(_) => RelationshipFamily::Session,
            Self::Performance(_) => RelationshipFamily::Performance,
            Self::Documentation(_) => RelationshipFamily::Documentation,
            Self::Testing(_) => RelationshipFamily::Testing,
        }
    }

    /// The stable type name used in ID hash bases.
    #[must_use]
    pub fn canonical_name(&self) -> String {
        match self {
            Self::Structural(kind) => kind.clone(),
            Self::Code(kind) => kind.name().to_string(),
            Self::Session(kind) => kind.name().to_string(),
            Self::Performance(kind) => kind.name().to_string(),
            Self::Documentation(kind) => kind.name().to_string(),
            Self::Testing(kind) => kind.name().to_string(),
        }
    }
}

/// A graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Externally assigned, graph-unique identifier.
    pub id: EntityId,
    /// The entity's type discriminator (e.g. `"function"`, `"file"`).
    pub entity_type: String,
    /// Source path, when the entity corresponds to a file-system location.
    pub path: Option<String>,
    /// Content hash, used to detect whether the entity changed.
    pub hash: String,
    /// Source language, when applicable.
    pub language: Option<String>,
    /// When this entity was first created.
    pub created: DateTime<Utc>,
    /// When this entity was last modified.
    pub last_modified: DateTime<Utc>,
    /// Type-specific attributes not modeled as dedicated fields.
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl Entity {
    /// Creates a new entity with `created`/`last_modified` both set to
    /// `now`.
    #[must_use]
    pub fn new(
        id: EntityId,
        entity_type: impl Into<String>,
        hash: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            entity_type: entity_type.into(),
            path: None,
            hash: hash.into(),
            language: None,
            created: now,
            last_modified: now,
            attributes: HashMap::new(),
        }
    }

    /// Sets the source path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the source language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Adds a type-specific attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// A directed edge in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Derived canonical ID; never set directly by a caller.
    pub id: RelationshipId,
    /// The source entity.
    pub from_entity_id: EntityId,
    /// The raw target entity ID (used when `to_ref` cannot resolve it more
    /// specifically).
    pub to_entity_id: EntityId,
    /// The resolved target, when known structurally.
    pub to_ref: Option<TargetRef>,
    /// The relationship's type and family.
    pub relation_type: RelationshipType,
    /// When this relationship was first created.
    pub created: DateTime<Utc>,
    /// When this relationship was last modified.
    pub last_modified: DateTime<Utc>,
    /// Monotonically incremented on each update.
    pub version: u64,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Session-family: the owning session.
    pub session_id: Option<String>,
    /// Session-family: monotonic sequence number within `session_id`.
    pub sequence_number: Option<i64>,
    /// Performance-family: the metric this relationship is about.
    pub metric_id: Option<String>,
    /// Performance-family: the environment the metric was observed in.
    pub environment: Option<String>,
    /// Performance-family: the benchmark/test scenario.
    pub scenario: Option<String>,
    /// Qualifiers (e.g. acceptance-criteria IDs) that participate in
    /// identity but are insensitive to input order (sorted before
    /// hashing).
    #[serde(default)]
    pub qualifiers: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_displays_inner_string() {
        let id = EntityId::new("entity-1");
        assert_eq!(id.to_string(), "entity-1");
        assert_eq!(id.as_str(), "entity-1");
    }

    #[test]
    fn target_ref_canonical_key_formats() {
        assert_eq!(
            TargetRef::Fs {
                file: "src/lib.rs".into(),
                symbol: "foo".into()
            }
            .canonical_key(),
            "FS:src/lib.rs:foo"
        );
        assert_eq!(
            TargetRef::Ext {
                name: "std::vec::Vec".into()
            }
            .canonical_key(),
            "EXT:std::vec::Vec"
        );
        assert_eq!(
            TargetRef::Ent { id: "e1".into() }.canonical_key(),
            "ENT:e1"
        );
        assert_eq!(
            TargetRef::Raw {
                raw: "???".into()
            }
            .canonical_key(),
            "RAW:???"
        );
    }

    #[test]
    fn relationship_family_prefixes_match_spec() {
        assert_eq!(
            RelationshipType::Structural("SUBTYPE_OF".into())
                .family()
                .id_prefix(),
            "time-rel_"
        );
        assert_eq!(
            RelationshipType::Code(CodeRelationKind::Calls)
                .family()
                .id_prefix(),
            "rel_"
        );
        assert_eq!(
            RelationshipType::Session(SessionRelationKind::State)
                .family()
                .id_prefix(),
            "rel_session_"
        );
        assert_eq!(
            RelationshipType::Performance(PerformanceRelationKind::Regression)
                .family()
                .id_prefix(),
            "rel_perf_"
        );
        assert_eq!(
            RelationshipType::Testing(TestingRelationKind::Tests)
                .family()
                .id_prefix(),
            "rel_"
        );
    }

    #[test]
    fn code_relation_kind_names_are_upper_snake() {
        assert_eq!(CodeRelationKind::DependsOn.name(), "DEPENDS_ON");
        assert_eq!(CodeRelationKind::TypeUses.name(), "TYPE_USES");
    }
}
