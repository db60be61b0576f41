//! Core data model, canonicalization, and diff engine for the Memento
//! knowledge graph.
//!
//! This crate has no I/O: it is the pure substrate shared by the snapshot
//! store, the rollback engine, the ingestion pipeline, and the temporal
//! tracker.
//!
//! # Modules
//!
//! - [`model`]: entities, relationships, relationship families.
//! - [`identity`]: canonical relationship ID computation.
//! - [`canonical`]: the tagged-variant value representation shared by the
//!   diff engine and snapshot serialization.
//! - [`diff`]: path-addressed structural diffing and application.
//! - [`clock`]: injectable time source for deterministic tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod canonical;
pub mod clock;
pub mod diff;
pub mod identity;
pub mod model;

pub use canonical::CanonicalValue;
pub use clock::{Clock, FixedClock, SystemClock};
pub use diff::{
    apply_diff, deep_equals, deep_equals_opts, generate_object_diff, render_path, summarize_diff,
    ApplyError, CustomComparator, DiffComplexity, DiffEntry, DiffOp, DiffOptions, DiffSummary,
    PathSegment,
};
pub use identity::{canonical_relationship_id, canonical_target_key, RelationshipDraft};
pub use model::{
    CodeRelationKind, DocumentationRelationKind, Entity, EntityId, PerformanceRelationKind,
    Relationship, RelationshipFamily, RelationshipId, RelationshipType, SessionRelationKind,
    TargetRef, TestingRelationKind,
};
