//! Rollback strategies sharing one lifecycle.
//!
//! Every strategy implements [`RollbackStrategy`]: `validate` decides
//! applicability, `estimate_time_ms` gives a caller a duration to display,
//! and `execute` performs the restore, writing progress and structured
//! log lines onto the [`RollbackOperation`] as it goes. This mirrors the
//! `BaseRollbackStrategy` → concrete-strategy shape described in the
//! design notes: rather than an inheritance hierarchy, each strategy
//! embeds a [`StrategyContext`] and calls shared free functions for
//! conflict detection and logging.

pub mod force;
pub mod gradual;
pub mod immediate;
pub mod safe;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use memento_core::{CanonicalValue, DiffEntry, PathSegment};

use crate::conflict::{ConflictKind, ConflictResolver, ConflictStrategy, RollbackConflict};
use crate::error::Result;
use crate::types::{LogLevel, RollbackOperation};

pub use force::ForceStrategy;
pub use gradual::GradualStrategy;
pub use immediate::ImmediateStrategy;
pub use safe::SafeStrategy;

/// The thing a rollback is applied against: a read/write view over
/// whatever state the diff's paths address.
///
/// In production this is backed by the knowledge-graph and session
/// collaborators; `memento-collab`'s in-memory doubles implement it
/// directly over a [`CanonicalValue`] tree for tests.
#[async_trait]
pub trait DiffTarget: Send + Sync {
    /// Reads the current value at `path`, or `None` if the path does not
    /// resolve.
    async fn current_value(&self, path: &[PathSegment]) -> Result<Option<CanonicalValue>>;

    /// Applies one diff entry.
    async fn apply_entry(&self, entry: &DiffEntry) -> Result<()>;

    /// Captures a safety backup the target can restore from via
    /// [`Self::restore_backup`]. Used by [`SafeStrategy`].
    async fn capture_backup(&self) -> Result<CanonicalValue>;

    /// Restores state from a backup captured by [`Self::capture_backup`].
    async fn restore_backup(&self, backup: &CanonicalValue) -> Result<()>;
}

/// The inputs a strategy needs to execute, independent of which target
/// it runs against.
#[derive(Clone)]
pub struct StrategyContext {
    /// The diff to apply, in the order the manager produced it.
    pub diff: Vec<DiffEntry>,
    /// When the target rollback point was created.
    pub rollback_point_timestamp: DateTime<Utc>,
    /// How to resolve any detected conflicts.
    pub conflict_strategy: ConflictStrategy,
    /// Resolver used by [`ConflictStrategy::AskUser`].
    pub resolver: Option<std::sync::Arc<dyn ConflictResolver>>,
    /// The current time, for age-based decisions.
    pub now: DateTime<Utc>,
}

/// Compares each diff entry's expected prior value against the target's
/// current value, returning the indices that conflict.
pub async fn detect_conflicts(
    target: &dyn DiffTarget,
    diff: &[DiffEntry],
) -> Result<Vec<(usize, RollbackConflict)>> {
    let mut conflicts = Vec::new();
    for (index, entry) in diff.iter().enumerate() {
        let current = target.current_value(&entry.path).await?;
        if let Some(kind) = classify_conflict(entry, current.as_ref()) {
            conflicts.push((
                index,
                RollbackConflict {
                    kind,
                    entry: entry.clone(),
                    reason: describe_conflict(kind, entry),
                },
            ));
        }
    }
    Ok(conflicts)
}

fn classify_conflict(
    entry: &DiffEntry,
    current: Option<&CanonicalValue>,
) -> Option<ConflictKind> {
    use memento_core::DiffOp;

    match (&entry.op, current) {
        (DiffOp::Create, _) => None,
        (_, None) => Some(ConflictKind::MissingTarget),
        (DiffOp::Update | DiffOp::Delete, Some(current)) => {
            let Some(expected) = &entry.old_value else {
                return None;
            };
            if expected.kind_name() != current.kind_name() {
                Some(ConflictKind::TypeMismatch)
            } else if !memento_core::deep_equals(expected, current) {
                Some(ConflictKind::ValueMismatch)
            } else {
                None
            }
        }
        (DiffOp::Move { .. }, Some(_)) => None,
    }
}

fn describe_conflict(kind: ConflictKind, entry: &DiffEntry) -> String {
    format!(
        "{kind} at {}",
        memento_core::render_path(&entry.path)
    )
}

/// Shared lifecycle every rollback strategy implements.
#[async_trait]
pub trait RollbackStrategy: Send + Sync {
    /// This strategy's kind, for logging and operation records.
    fn kind(&self) -> crate::types::StrategyKind;

    /// Whether this strategy applies to `ctx`.
    fn validate(&self, ctx: &StrategyContext) -> bool;

    /// A rough duration estimate, for caller-facing progress display.
    fn estimate_time_ms(&self, ctx: &StrategyContext) -> u64;

    /// Executes the rollback against `target`, writing progress and log
    /// entries onto `operation`.
    async fn execute(
        &self,
        target: &dyn DiffTarget,
        ctx: &StrategyContext,
        operation: &mut RollbackOperation,
    ) -> Result<()>;
}

fn log_info(operation: &mut RollbackOperation, now: DateTime<Utc>, message: impl Into<String>) {
    operation.log(now, LogLevel::Info, message);
}

fn log_warn(operation: &mut RollbackOperation, now: DateTime<Utc>, message: impl Into<String>) {
    operation.log(now, LogLevel::Warn, message);
}

pub(crate) use {log_info, log_warn};

#[cfg(test)]
pub(crate) mod test_support {
    use super::{CanonicalValue, DiffEntry, DiffTarget, PathSegment};
    use crate::error::{Result, RollbackError};
    use async_trait::async_trait;
    use parking_lot::RwLock;

    /// An in-memory [`DiffTarget`] over a single [`CanonicalValue`] tree,
    /// used by strategy unit tests.
    pub struct TreeTarget {
        tree: RwLock<CanonicalValue>,
    }

    impl TreeTarget {
        pub fn new(tree: CanonicalValue) -> Self {
            Self {
                tree: RwLock::new(tree),
            }
        }

        pub fn snapshot(&self) -> CanonicalValue {
            self.tree.read().clone()
        }
    }

    #[async_trait]
    impl DiffTarget for TreeTarget {
        async fn current_value(&self, path: &[PathSegment]) -> Result<Option<CanonicalValue>> {
            let tree = self.tree.read();
            Ok(navigate(&tree, path))
        }

        async fn apply_entry(&self, entry: &DiffEntry) -> Result<()> {
            let mut tree = self.tree.write();
            memento_core::apply_diff(&mut tree, std::slice::from_ref(entry))
                .map_err(RollbackError::from)
        }

        async fn capture_backup(&self) -> Result<CanonicalValue> {
            Ok(self.tree.read().clone())
        }

        async fn restore_backup(&self, backup: &CanonicalValue) -> Result<()> {
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
}
