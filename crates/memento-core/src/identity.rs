//! Canonical relationship ID computation.
//!
//! A relationship's ID is never supplied by a caller: it is derived from a
//! family-specific tuple of its other fields, so that re-ingesting the same
//! logical edge always produces the same ID and graph writes are
//! idempotent. This module never panics; a draft missing the fields its
//! family needs falls back to a `RAW:`-keyed base rather than failing.

use sha1::{Digest, Sha1};

use crate::model::{RelationshipFamily, RelationshipId, RelationshipType, TargetRef};

/// The inputs needed to compute a [`RelationshipId`], without the ID
/// itself.
///
/// Borrowing rather than owning keeps this cheap to build from an
/// in-progress [`crate::model::Relationship`] before its ID field exists.
#[derive(Debug, Clone, Copy)]
pub struct RelationshipDraft<'a> {
    /// The source entity ID.
    pub from_entity_id: &'a str,
    /// The raw target entity ID.
    pub to_entity_id: &'a str,
    /// The resolved target, preferred over `to_entity_id` when present.
    pub to_ref: Option<&'a TargetRef>,
    /// The relationship's type.
    pub relation_type: &'a RelationshipType,
    /// Session-family: the owning session.
    pub session_id: Option<&'a str>,
    /// Session-family: sequence number within the session.
    pub sequence_number: Option<i64>,
    /// Performance-family: the metric ID.
    pub metric_id: Option<&'a str>,
    /// Performance-family: the environment.
    pub environment: Option<&'a str>,
    /// Performance-family: the scenario.
    pub scenario: Option<&'a str>,
    /// Order-insensitive qualifiers (sorted before hashing).
    pub qualifiers: &'a [String],
}

/// Resolves the canonical target key used in relationship ID bases,
/// preferring a structurally resolved [`TargetRef`] over the raw entity ID
/// string.
#[must_use]
pub fn canonical_target_key(to_entity_id: &str, to_ref: Option<&TargetRef>) -> String {
    match to_ref {
        Some(target) => target.canonical_key(),
        None if to_entity_id.is_empty() => "RAW:".to_string(),
        None => format!("ENT:{to_entity_id}"),
    }
}

fn sorted_qualifiers(qualifiers: &[String]) -> String {
    let mut sorted: Vec<&str> = qualifiers.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.join(",")
}

fn sha1_hex(base: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(base.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Computes the canonical, deterministic ID for a relationship.
///
/// The hash base and ID prefix are family-specific:
///
/// - Structural: `from|canonicalTargetKey(to)|type` under `time-rel_`.
/// - Session: `sessionId|sequenceNumber|type` under `rel_session_`, with a
///   missing or negative sequence number coerced to `0`.
/// - Performance: `from|to|type|metricId|environment|scenario` under
///   `rel_perf_`.
/// - Code, Documentation, Testing: `from|canonicalTargetKey(to)|type` under
///   `rel_`.
///
/// Qualifiers are sorted before being folded into the base, so relationship
/// identity is insensitive to the order qualifiers were supplied in.
#[must_use]
pub fn canonical_relationship_id(draft: RelationshipDraft<'_>) -> RelationshipId {
    let family = draft.relation_type.family();
    let type_name = draft.relation_type.canonical_name();
    let qualifiers = sorted_qualifiers(draft.qualifiers);

    let base = match family {
        RelationshipFamily::Structural | RelationshipFamily::Code => {
            let target = canonical_target_key(draft.to_entity_id, draft.to_ref);
            format!(
                "{}|{}|{}|{}",
                draft.from_entity_id, target, type_name, qualifiers
            )
        }
        RelationshipFamily::Documentation | RelationshipFamily::Testing => {
            let target = canonical_target_key(draft.to_entity_id, draft.to_ref);
            format!(
                "{}|{}|{}|{}",
                draft.from_entity_id, target, type_name, qualifiers
            )
        }
        RelationshipFamily::Session => {
            let sequence = draft.sequence_number.unwrap_or(0).max(0);
            let session = draft.session_id.unwrap_or("");
            format!("{session}|{sequence}|{type_name}|{qualifiers}")
        }
        RelationshipFamily::Performance => {
            let metric = draft.metric_id.unwrap_or("");
            let environment = draft.environment.unwrap_or("");
            let scenario = draft.scenario.unwrap_or("");
            format!(
                "{}|{}|{}|{}|{}|{}|{}",
                draft.from_entity_id,
                draft.to_entity_id,
                type_name,
                metric,
                environment,
                scenario,
                qualifiers
            )
        }
    };

    let prefix = family.id_prefix();
    RelationshipId::from_raw(format!("{prefix}{}", sha1_hex(&base)))
}
