//! The `Gradual` rollback strategy.
//!
//! Partitions the diff into fixed-size batches with an inter-batch delay,
//! detecting and resolving conflicts per batch. Batch `N + 1` never
//! starts until batch `N` has committed.

use async_trait::async_trait;
use std::time::Duration;

use super::{detect_conflicts, log_info, DiffTarget, RollbackStrategy, StrategyContext};
use crate::conflict::resolve_conflicts;
use crate::error::{Result, RollbackError};
use crate::types::{RollbackOperation, StrategyKind};

/// Default number of diff entries per batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// Default delay between batches.
pub const DEFAULT_INTER_BATCH_DELAY: Duration = Duration::from_secs(1);
/// `validate` refuses diffs at or below this length; they're cheap enough
/// for [`super::ImmediateStrategy`] instead.
pub const MIN_DIFF_LEN: usize = 5;

/// Applies the diff in batches, sleeping between them.
pub struct GradualStrategy {
    /// Entries per batch.
    pub batch_size: usize,
    /// Delay applied after each batch but the last.
    pub inter_batch_delay: Duration,
}

impl Default for GradualStrategy {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            inter_batch_delay: DEFAULT_INTER_BATCH_DELAY,
        }
    }
}

#[async_trait]
impl RollbackStrategy for GradualStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Gradual
    }

    fn validate(&self, ctx: &StrategyContext) -> bool {
        ctx.diff.len() > MIN_DIFF_LEN
    }

    fn estimate_time_ms(&self, ctx: &StrategyContext) -> u64 {
        let batches = ctx.diff.len().div_ceil(self.batch_size.max(1)) as u64;
        batches.saturating_mul(self.inter_batch_delay.as_millis() as u64)
    }

    async fn execute(
        &self,
        target: &dyn DiffTarget,
        ctx: &StrategyContext,
        operation: &mut RollbackOperation,
    ) -> Result<()> {
        if !self.validate(ctx) {
            return Err(RollbackError::StrategyValidationFailed {
                reason: format!(
                    "gradual strategy requires diff length > {MIN_DIFF_LEN}, got {}",
                    ctx.diff.len()
                ),
            });
        }

        let batch_size = self.batch_size.max(1);
        let total_batches = ctx.diff.len().div_ceil(batch_size);

        for (batch_index, batch) in ctx.diff.chunks(batch_size).enumerate() {
            log_info(
                operation,
                ctx.now,
                format!(
                    "gradual: batch {}/{total_batches} ({} entries)",
                    batch_index + 1,
                    batch.len()
                ),
            );

            let conflicts = detect_conflicts(target, batch).await?;
            let outcome = resolve_conflicts(
                &ctx.conflict_strategy,
                batch.len(),
                conflicts,
                ctx.resolver.as_deref(),
            )
            .map_err(|_| RollbackError::ResolverRequired)?;

            if !outcome.fatal.is_empty() {
                return Err(RollbackError::Conflict(outcome.fatal));
            }

            for &index in &outcome.surviving_indices {
                target.apply_entry(&batch[index]).await?;
            }

            let progress = (((batch_index + 1) * 100) / total_batches) as u8;
            operation.set_progress(progress);

            if batch_index + 1 < total_batches {
                tokio::time::sleep(self.inter_batch_delay).await;
            }
        }

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

    fn object(pairs: impl IntoIterator<Item = (String, CanonicalValue)>) -> CanonicalValue {
        CanonicalValue::Object(pairs.into_iter().collect())
    }

    fn big_diff_context() -> (CanonicalValue, CanonicalValue) {
        let mut old_pairs = Vec::new();
        let mut new_pairs = Vec::new();
        for i in 0..12 {
            old_pairs.push((format!("k{i}"), CanonicalValue::String("old".to_string())));
            new_pairs.push((format!("k{i}"), CanonicalValue::String("new".to_string())));
        }
        (object(old_pairs), object(new_pairs))
    }

    #[test]
    fn validate_rejects_small_diffs() {
        let strategy = GradualStrategy::default();
        let ctx = StrategyContext {
            diff: vec![],
            rollback_point_timestamp: Utc::now(),
            conflict_strategy: ConflictStrategy::Abort,
            resolver: None,
            now: Utc::now(),
        };
        assert!(!strategy.validate(&ctx));
    }

    #[tokio::test]
    async fn applies_all_batches_and_reaches_full_progress() {
        let (old, new) = big_diff_context();
        let diff = memento_core::generate_object_diff(&old, &new, &DiffOptions::default());
        assert!(diff.len() > MIN_DIFF_LEN);

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
            StrategyKind::Gradual,
            Utc::now(),
        );
        let strategy = GradualStrategy {
            batch_size: 4,
            inter_batch_delay: Duration::from_millis(1),
        };
        strategy
            .execute(&target, &ctx, &mut operation)
            .await
            .expect("execute should succeed");
        assert_eq!(operation.progress, 100);
        assert!(memento_core::deep_equals(&target.snapshot(), &new));
    }
}
