//! Conflict taxonomy and resolution policies.

use memento_core::DiffEntry;

/// The kind of conflict detected between a diff entry and current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// The current value differs from what the diff expected to find.
    ValueMismatch,
    /// The current value's type differs from what the diff expected.
    TypeMismatch,
    /// The diff's target path does not exist in current state.
    MissingTarget,
    /// The caller lacks permission to modify the target path.
    PermissionDenied,
    /// Applying this entry would violate a dependency ordering
    /// constraint.
    DependencyConflict,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::ValueMismatch => "VALUE_MISMATCH",
            Self::TypeMismatch => "TYPE_MISMATCH",
            Self::MissingTarget => "MISSING_TARGET",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::DependencyConflict => "DEPENDENCY_CONFLICT",
        };
        write!(f, "{label}")
    }
}

/// A single detected conflict between a diff entry and the current state
/// it would be applied against.
#[derive(Debug, Clone)]
pub struct RollbackConflict {
    /// The kind of conflict.
    pub kind: ConflictKind,
    /// The diff entry that conflicts.
    pub entry: DiffEntry,
    /// A human-readable explanation.
    pub reason: String,
}

/// How conflicts detected during a rollback are resolved.
#[derive(Debug, Clone)]
pub enum ConflictStrategy {
    /// Abort the whole operation, surfacing every conflict.
    Abort,
    /// Drop conflicted entries and proceed with the rest.
    Skip,
    /// Apply the rollback value regardless of the conflict.
    Overwrite,
    /// Defer to a caller-supplied resolver for each conflict.
    AskUser,
    /// Apply a heuristic merge: prefer the rollback value for
    /// `ValueMismatch`; skip `MissingTarget` and `TypeMismatch`.
    Merge,
}

/// What to do with one conflicted entry, returned by a resolver under
/// [`ConflictStrategy::AskUser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Apply the entry anyway.
    Apply,
    /// Drop the entry.
    Drop,
}

/// Supplies per-conflict decisions for [`ConflictStrategy::AskUser`].
pub trait ConflictResolver: Send + Sync {
    /// Decides how to handle one conflict.
    fn resolve(&self, conflict: &RollbackConflict) -> Resolution;
}

/// The outcome of applying a [`ConflictStrategy`] to a set of detected
/// conflicts: which entries survive to be applied, and which conflicts
/// should be surfaced as an error (non-empty only under `Abort`, or when
/// `AskUser` has no resolver).
pub struct ResolutionOutcome {
    /// Indices into the original diff whose entries should still be
    /// applied.
    pub surviving_indices: Vec<usize>,
    /// Conflicts that should cause the whole operation to fail.
    pub fatal: Vec<RollbackConflict>,
}

/// Applies `strategy` to `conflicts` detected among `diff_len` total diff
/// entries (indices not present in `conflicts` are assumed conflict-free
/// and always survive).
///
/// # Errors
///
/// Returns an error only when `AskUser` is selected with no `resolver`.
pub fn resolve_conflicts(
    strategy: &ConflictStrategy,
    diff_len: usize,
    conflicts: Vec<(usize, RollbackConflict)>,
    resolver: Option<&dyn ConflictResolver>,
) -> Result<ResolutionOutcome, &'static str> {
    let conflicted_indices: std::collections::HashSet<usize> =
        conflicts.iter().map(|(i, _)| *i).collect();
    let clean_indices: Vec<usize> = (0..diff_len)
        .filter(|i| !conflicted_indices.contains(i))
        .collect();

    match strategy {
        ConflictStrategy::Abort => {
            if conflicts.is_empty() {
                Ok(ResolutionOutcome {
                    surviving_indices: clean_indices,
                    fatal: Vec::new(),
                })
            } else {
                Ok(ResolutionOutcome {
                    surviving_indices: Vec::new(),
                    fatal: conflicts.into_iter().map(|(_, c)| c).collect(),
                })
            }
        }
        ConflictStrategy::Skip => Ok(ResolutionOutcome {
            surviving_indices: clean_indices,
            fatal: Vec::new(),
        }),
        ConflictStrategy::Overwrite => {
            let mut surviving = clean_indices;
            surviving.extend(conflicts.into_iter().map(|(i, _)| i));
            surviving.sort_unstable();
            Ok(ResolutionOutcome {
                surviving_indices: surviving,
                fatal: Vec::new(),
            })
        }
        ConflictStrategy::AskUser => {
            let Some(resolver) = resolver else {
                return Err("conflict resolution requires a resolver but none was supplied");
            };
            let mut surviving = clean_indices;
            for (index, conflict) in &conflicts {
                if resolver.resolve(conflict) == Resolution::Apply {
                    surviving.push(*index);
                }
            }
            surviving.sort_unstable();
            Ok(ResolutionOutcome {
                surviving_indices: surviving,
                fatal: Vec::new(),
            })
        }
        ConflictStrategy::Merge => {
            let mut surviving = clean_indices;
            for (index, conflict) in &conflicts {
                if conflict.kind == ConflictKind::ValueMismatch {
                    surviving.push(*index);
                }
                // MissingTarget and TypeMismatch are skipped.
            }
            surviving.sort_unstable();
            Ok(ResolutionOutcome {
                surviving_indices: surviving,
                fatal: Vec::new(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memento_core::{DiffOp, PathSegment};

    fn sample_entry() -> DiffEntry {
        DiffEntry {
            path: vec![PathSegment::Key("name".to_string())],
            op: DiffOp::Update,
            old_value: None,
            new_value: None,
        }
    }

    fn sample_conflict(kind: ConflictKind) -> RollbackConflict {
        RollbackConflict {
            kind,
            entry: sample_entry(),
            reason: "test".to_string(),
        }
    }

    #[test]
    fn abort_surfaces_all_conflicts_as_fatal() {
        let conflicts = vec![(0, sample_conflict(ConflictKind::ValueMismatch))];
        let outcome = resolve_conflicts(&ConflictStrategy::Abort, 1, conflicts, None).unwrap();
        assert_eq!(outcome.fatal.len(), 1);
        assert!(outcome.surviving_indices.is_empty());
    }

    #[test]
    fn skip_drops_conflicted_entries() {
        let conflicts = vec![(0, sample_conflict(ConflictKind::ValueMismatch))];
        let outcome = resolve_conflicts(&ConflictStrategy::Skip, 2, conflicts, None).unwrap();
        assert_eq!(outcome.surviving_indices, vec![1]);
        assert!(outcome.fatal.is_empty());
    }

    #[test]
    fn overwrite_applies_every_entry() {
        let conflicts = vec![(0, sample_conflict(ConflictKind::ValueMismatch))];
        let outcome = resolve_conflicts(&ConflictStrategy::Overwrite, 2, conflicts, None).unwrap();
        assert_eq!(outcome.surviving_indices, vec![0, 1]);
    }

    #[test]
    fn merge_keeps_value_mismatch_but_drops_missing_target() {
        let conflicts = vec![
            (0, sample_conflict(ConflictKind::ValueMismatch)),
            (1, sample_conflict(ConflictKind::MissingTarget)),
        ];
        let outcome = resolve_conflicts(&ConflictStrategy::Merge, 2, conflicts, None).unwrap();
        assert_eq!(outcome.surviving_indices, vec![0]);
    }

    #[test]
    fn ask_user_without_resolver_errors() {
        let conflicts = vec![(0, sample_conflict(ConflictKind::ValueMismatch))];
        let result = resolve_conflicts(&ConflictStrategy::AskUser, 1, conflicts, None);
        assert!(result.is_err());
    }

    struct AlwaysApply;
    impl ConflictResolver for AlwaysApply {
        fn resolve(&self, _conflict: &RollbackConflict) -> Resolution {
            Resolution::Apply
        }
    }

    #[test]
    fn ask_user_with_resolver_applies_per_decision() {
        let conflicts = vec![(0, sample_conflict(ConflictKind::ValueMismatch))];
        let resolver = AlwaysApply;
        let outcome =
            resolve_conflicts(&ConflictStrategy::AskUser, 1, conflicts, Some(&resolver)).unwrap();
        assert_eq!(outcome.surviving_indices, vec![0]);
    }
}
