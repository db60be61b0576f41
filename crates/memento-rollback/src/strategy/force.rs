//! The `Force` rollback strategy.
//!
//! Skips validation and conflict detection entirely for maximal
//! throughput. Logs a warning so the skip is visible in the operation's
//! audit trail.

use async_trait::async_trait;

use super::{log_warn, DiffTarget, RollbackStrategy, StrategyContext};
use crate::error::Result;
use crate::types::{RollbackOperation, StrategyKind};

/// Applies every diff entry sequentially with no conflict checking.
#[derive(Debug, Default)]
pub struct ForceStrategy;

#[async_trait]
impl RollbackStrategy for ForceStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Force
    }

    fn validate(&self, _ctx: &StrategyContext) -> bool {
        true
    }

    fn estimate_time_ms(&self, ctx: &StrategyContext) -> u64 {
        (ctx.diff.len() as u64).saturating_mul(2)
    }

    async fn execute(
        &self,
        target: &dyn DiffTarget,
        ctx: &StrategyContext,
        operation: &mut RollbackOperation,
    ) -> Result<()> {
        log_warn(
            operation,
            ctx.now,
            "force: skipping validation and conflict detection",
        );

        let total = ctx.diff.len().max(1);
        for (done, entry) in ctx.diff.iter().enumerate() {
            target.apply_entry(entry).await?;
            let progress = ((done + 1) * 100 / total) as u8;
            operation.set_progress(progress);
        }

        operation.set_progress(100);
        Ok(())
    }
}
