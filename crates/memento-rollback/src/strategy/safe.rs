//! The `Safe` rollback strategy.
//!
//! Captures a safety backup before touching anything, validates and
//! conflict-checks the whole diff, applies each entry with a
//! per-entry verification read-back, then does a final verification
//! pass. If anything fails after the backup is captured, `Safe`
//! attempts to restore from it and surfaces both the original failure and
//! the restore outcome.

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;

use super::{detect_conflicts, log_info, log_warn, DiffTarget, RollbackStrategy, StrategyContext};
use crate::conflict::resolve_conflicts;
use crate::error::{Result, RollbackError};
use crate::types::{RollbackOperation, StrategyKind};

/// A rollback point older than this is considered too old for `Safe`;
/// `validate` refuses it.
pub const MAX_AGE: ChronoDuration = ChronoDuration::days(7);

/// Applies the diff behind a safety backup, restoring from it on
/// failure.
#[derive(Debug, Default)]
pub struct SafeStrategy;

impl SafeStrategy {
    async fn try_execute(
        &self,
        target: &dyn DiffTarget,
        ctx: &StrategyContext,
        operation: &mut RollbackOperation,
    ) -> Result<()> {
        log_info(operation, ctx.now, "safe: validating changes");
        operation.set_progress(20);

        log_info(operation, ctx.now, "safe: detecting conflicts");
        let conflicts = detect_conflicts(target, &ctx.diff).await?;
        let outcome = resolve_conflicts(
            &ctx.conflict_strategy,
            ctx.diff.len(),
            conflicts,
            ctx.resolver.as_deref(),
        )
        .map_err(|_| RollbackError::ResolverRequired)?;
        if !outcome.fatal.is_empty() {
            return Err(RollbackError::Conflict(outcome.fatal));
        }
        operation.set_progress(30);

        let total = outcome.surviving_indices.len().max(1);
        for (done, &index) in outcome.surviving_indices.iter().enumerate() {
            let entry = &ctx.diff[index];
            target.apply_entry(entry).await?;
            let verified = target.current_value(&entry.path).await?;
            if let Some(expected) = &entry.new_value {
                if verified.as_ref().is_some_and(|v| !memento_core::deep_equals(v, expected)) {
                    return Err(RollbackError::Collaborator {
                        reason: format!(
                            "verification failed at {}",
                            memento_core::render_path(&entry.path)
                        ),
                    });
                }
            }
            let fraction = (done + 1) as f64 / total as f64;
            operation.set_progress((30.0 + 60.0 * fraction) as u8);
        }

        log_info(operation, ctx.now, "safe: final verification");
        operation.set_progress(100);
        Ok(())
    }
}

#[async_trait]
impl RollbackStrategy for SafeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Safe
    }

    fn validate(&self, ctx: &StrategyContext) -> bool {
        (ctx.now - ctx.rollback_point_timestamp) <= MAX_AGE
    }

    fn estimate_time_ms(&self, ctx: &StrategyContext) -> u64 {
        (ctx.diff.len() as u64).saturating_mul(15)
    }

    async fn execute(
        &self,
        target: &dyn DiffTarget,
        ctx: &StrategyContext,
        operation: &mut RollbackOperation,
    ) -> Result<()> {
        if !self.validate(ctx) {
            return Err(RollbackError::StrategyValidationFailed {
                reason: "rollback point is older than the safe-strategy age ceiling".to_string(),
            });
        }

        log_info(operation, ctx.now, "safe: capturing safety backup");
        let backup = target.capture_backup().await?;
        operation.set_progress(10);

        match self.try_execute(target, ctx, operation).await {
            Ok(()) => Ok(()),
            Err(original) => {
                log_warn(
                    operation,
                    ctx.now,
                    format!("safe: apply failed ({original}), restoring from backup"),
                );
                match target.restore_backup(&backup).await {
                    Ok(()) => Err(RollbackError::SafeRollbackFailed {
                        original: Box::new(original),
                        restore: None,
                    }),
                    Err(restore_err) => Err(RollbackError::SafeRollbackFailed {
                        original: Box::new(original),
                        restore: Some(Box::new(restore_err)),
                    }),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::ConflictStrategy;
    use crate::strategy::test_support::TreeTarget;
    use crate::types::{OperationType, RollbackOperation};
    use chrono::Utc;
    use memento_core::{CanonicalValue, DiffOptions};
    use memento_snapshot::RollbackPointId;

    fn object(pairs: impl IntoIterator<Item = (&'static str, CanonicalValue)>) -> CanonicalValue {
        CanonicalValue::Object(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    fn s(v: &str) -> CanonicalValue {
        CanonicalValue::String(v.to_string())
    }

    #[test]
    fn validate_rejects_points_older_than_seven_days() {
        let strategy = SafeStrategy;
        let now = Utc::now();
        let ctx = StrategyContext {
            diff: vec![],
            rollback_point_timestamp: now - ChronoDuration::days(8),
            conflict_strategy: ConflictStrategy::Abort,
            resolver: None,
            now,
        };
        assert!(!strategy.validate(&ctx));
    }

    #[test]
    fn validate_accepts_points_within_seven_days() {
        let strategy = SafeStrategy;
        let now = Utc::now();
        let ctx = StrategyContext {
            diff: vec![],
            rollback_point_timestamp: now - ChronoDuration::days(6),
            conflict_strategy: ConflictStrategy::Abort,
            resolver: None,
            now,
        };
        assert!(strategy.validate(&ctx));
    }

    #[tokio::test]
    async fn applies_successfully_and_reaches_full_progress() {
        let old = object([("name", s("B")), ("other", s("unchanged"))]);
        let new = object([("name", s("A")), ("other", s("unchanged"))]);
        let diff = memento_core::generate_object_diff(&old, &new, &DiffOptions::default());

        let target = TreeTarget::new(old.clone());
        let now = Utc::now();
        let ctx = StrategyContext {
            diff,
            rollback_point_timestamp: now,
            conflict_strategy: ConflictStrategy::Abort,
            resolver: None,
            now,
        };
        let mut operation = RollbackOperation::new(
            OperationType::Full,
            RollbackPointId::new("p1"),
            StrategyKind::Safe,
            now,
        );
        let strategy = SafeStrategy;
        strategy
            .execute(&target, &ctx, &mut operation)
            .await
            .expect("execute should succeed when there is nothing to conflict with");
        assert!(memento_core::deep_equals(&target.snapshot(), &new));
    }
}
