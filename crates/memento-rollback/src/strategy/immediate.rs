//! The `Immediate` rollback strategy.
//!
//! Detects conflicts across the whole diff up front, resolves them per
//! the configured [`ConflictStrategy`], then applies the surviving
//! entries sequentially.

use async_trait::async_trait;

use super::{detect_conflicts, log_info, DiffTarget, RollbackStrategy, StrategyContext};
use crate::conflict::resolve_conflicts;
use crate::error::{Result, RollbackError};
use crate::types::{RollbackOperation, StrategyKind};

/// Applies the whole diff in one pass after a single conflict-detection
/// round.
#[derive(Debug, Default)]
pub struct ImmediateStrategy;

#[async_trait]
impl RollbackStrategy for ImmediateStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Immediate
    }

    fn validate(&self, _ctx: &StrategyContext) -> bool {
        true
    }

    fn estimate_time_ms(&self, ctx: &StrategyContext) -> u64 {
        (ctx.diff.len() as u64).saturating_mul(5)
    }

    async fn execute(
        &self,
        target: &dyn DiffTarget,
        ctx: &StrategyContext,
        operation: &mut RollbackOperation,
    ) -> Result<()> {
        log_info(operation, ctx.now, "immediate: detecting conflicts");
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

        let total = outcome.surviving_indices.len().max(1);
        for (done, &index) in outcome.surviving_indices.iter().enumerate() {
            target.apply_entry(&ctx.diff[index]).await?;
            let progress = ((done + 1) * 100 / total) as u8;
            operation.set_progress(progress);
        }

        log_info(
            operation,
            ctx.now,
            format!("immediate: applied {} entries", outcome.surviving_indices.len()),
        );
        operation.set_progress(100);
        Ok(())
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

    #[tokio::test]
    async fn applies_diff_without_conflicts() {
        let old = object([("name", s("B"))]);
        let new = object([("name", s("A"))]);
        let diff = memento_core::generate_object_diff(&old, &new, &DiffOptions::default());
        let target = TreeTarget::new(old);
        let ctx = StrategyContext {
            diff,
            rollback_point_timestamp: Utc::now(),
            conflict_strategy: ConflictStrategy::Abort,
            resolver: None,
            now: Utc::now(),
        };
        let mut operation = RollbackOperation::new(
            OperationType::Full,
            RollbackPointId::new("p1"),
            StrategyKind::Immediate,
            Utc::now(),
        );
        let strategy = ImmediateStrategy;
        strategy
            .execute(&target, &ctx, &mut operation)
            .await
            .expect("execute should succeed");
        assert_eq!(operation.progress, 100);
        assert!(memento_core::deep_equals(&target.snapshot(), &new));
    }

    #[tokio::test]
    async fn aborts_on_conflicting_current_state() {
        let old = object([("name", s("B"))]);
        let new = object([("name", s("A"))]);
        let diff = memento_core::generate_object_diff(&old, &new, &DiffOptions::default());
        // Target's actual state diverges from what the diff expects.
        let target = TreeTarget::new(object([("name", s("SOMETHING_ELSE"))]));
        let ctx = StrategyContext {
            diff,
            rollback_point_timestamp: Utc::now(),
            conflict_strategy: ConflictStrategy::Abort,
            resolver: None,
            now: Utc::now(),
        };
        let mut operation = RollbackOperation::new(
            OperationType::Full,
            RollbackPointId::new("p1"),
            StrategyKind::Immediate,
            Utc::now(),
        );
        let strategy = ImmediateStrategy;
        let result = strategy.execute(&target, &ctx, &mut operation).await;
        assert!(matches!(result, Err(RollbackError::Conflict(_))));
    }
}
