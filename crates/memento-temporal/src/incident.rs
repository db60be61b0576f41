//! Automatic incident checkpointing on test-suite failure.
//!
//! Config is env-driven, mirroring the workspace's other threshold
//! configs, so an operator can gate and tune incident checkpoints without
//! a code change.

use chrono::{DateTime, Utc};
use memento_rollback::{RollbackManager, RollbackPointId};

use crate::error::{Result, TemporalError};
use crate::tracker::{TemporalTracker, TestSuiteReport};

/// Default relationship-hop expansion when neither
/// `HISTORY_INCIDENT_HOPS` nor `HISTORY_CHECKPOINT_HOPS` is set.
pub const DEFAULT_INCIDENT_HOPS: u8 = 2;

/// Env-driven gates and parameters for incident checkpointing.
#[derive(Debug, Clone, Copy)]
pub struct IncidentCheckpointConfig {
    /// Master switch for test-history tracking as a whole.
    pub history_enabled: bool,
    /// Switch for the incident-checkpoint behavior specifically.
    pub incident_enabled: bool,
    /// Relationship hops to expand from the failing tests' seed entities.
    pub hops: u8,
}

impl Default for IncidentCheckpointConfig {
    fn default() -> Self {
        Self {
            history_enabled: true,
            incident_enabled: true,
            hops: DEFAULT_INCIDENT_HOPS,
        }
    }
}

impl IncidentCheckpointConfig {
    /// Loads gates and hop count from the environment.
    ///
    /// `HISTORY_INCIDENT_HOPS` takes precedence over the older
    /// `HISTORY_CHECKPOINT_HOPS` name; both fall back to
    /// [`DEFAULT_INCIDENT_HOPS`].
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            history_enabled: env_bool("HISTORY_ENABLED").unwrap_or(true),
            incident_enabled: env_bool("HISTORY_INCIDENT_ENABLED").unwrap_or(true),
            hops: env_u8("HISTORY_INCIDENT_HOPS")
                .or_else(|| env_u8("HISTORY_CHECKPOINT_HOPS"))
                .unwrap_or(DEFAULT_INCIDENT_HOPS),
        }
    }

    const fn enabled(self) -> bool {
        self.history_enabled && self.incident_enabled
    }
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().and_then(|v| match v.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    })
}

fn env_u8(key: &str) -> Option<u8> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Seeds an incident rollback point from a suite's failing tests, if any
/// and if incident checkpointing is enabled.
///
/// # Errors
///
/// Returns [`TemporalError::Collaborator`] if expanding the checkpoint's
/// seed entities fails, or [`TemporalError::IncidentCheckpoint`] if
/// creating the rollback point itself fails.
pub async fn maybe_checkpoint(
    tracker: &TemporalTracker,
    rollback: &RollbackManager,
    suite: &TestSuiteReport,
    config: IncidentCheckpointConfig,
    now: DateTime<Utc>,
) -> Result<Option<RollbackPointId>> {
    if !config.enabled() {
        return Ok(None);
    }
    let has_failure = suite.results.iter().any(|r| r.status.is_failure());
    if !has_failure {
        return Ok(None);
    }

    let seeds = tracker.incident_seed_entities(suite).await?;
    if seeds.is_empty() {
        return Ok(None);
    }

    let expanded = rollback
        .expand_checkpoint(seeds, "incident", config.hops)
        .await
        .map_err(|e| TemporalError::IncidentCheckpoint { reason: e.to_string() })?;
    let _ = expanded;

    let point_id = RollbackPointId::new(format!("incident-{}", suite.run_id));
    rollback
        .create_point(point_id.clone(), format!("incident: {}", suite.run_id), now)
        .await
        .map_err(|e| TemporalError::IncidentCheckpoint { reason: e.to_string() })?;

    Ok(Some(point_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{PerfThresholds, TestResult, TestStatus};
    use async_trait::async_trait;
    use memento_collab::{InMemoryDatabase, InMemoryKnowledgeGraph, InMemorySessionManager};
    use memento_core::{CanonicalValue, DiffEntry, PathSegment};
    use memento_rollback::strategy::DiffTarget;
    use memento_rollback::{RollbackConfig, RollbackStore, StoreConfig};
    use memento_snapshot::SnapshotStore;
    use std::sync::Arc;

    /// Minimal no-op [`DiffTarget`] for tests that only exercise
    /// checkpoint creation, not diff application.
    struct NullTarget;

    #[async_trait]
    impl DiffTarget for NullTarget {
        async fn current_value(
            &self,
            _path: &[PathSegment],
        ) -> memento_rollback::Result<Option<CanonicalValue>> {
            Ok(None)
        }

        async fn apply_entry(&self, _entry: &DiffEntry) -> memento_rollback::Result<()> {
            Ok(())
        }

        async fn capture_backup(&self) -> memento_rollback::Result<CanonicalValue> {
            Ok(CanonicalValue::Null)
        }

        async fn restore_backup(&self, _backup: &CanonicalValue) -> memento_rollback::Result<()> {
            Ok(())
        }
    }

    fn suite_with_failure() -> TestSuiteReport {
        TestSuiteReport {
            run_id: "run-1".to_string(),
            results: vec![TestResult {
                test_id: "t1".to_string(),
                test_name: "t1-name".to_string(),
                duration_ms: 5.0,
                status: TestStatus::Failed,
                target_symbol: Some("sym".to_string()),
            }],
        }
    }

    #[tokio::test]
    async fn checkpoint_is_skipped_when_disabled() {
        let graph = Arc::new(InMemoryKnowledgeGraph::new());
        let tracker = TemporalTracker::new(graph.clone(), PerfThresholds::default());
        let rollback = RollbackManager::new(
            RollbackStore::new(StoreConfig::default()),
            SnapshotStore::new(10 * 1024 * 1024),
            graph,
            Arc::new(InMemorySessionManager::new()),
            Arc::new(InMemoryDatabase::new(true)),
            None,
            Arc::new(NullTarget),
            RollbackConfig::default(),
        );

        let result = maybe_checkpoint(
            &tracker,
            &rollback,
            &suite_with_failure(),
            IncidentCheckpointConfig {
                history_enabled: true,
                incident_enabled: false,
                hops: 2,
            },
            Utc::now(),
        )
        .await
        .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn checkpoint_is_created_for_a_failing_suite() {
        let graph = Arc::new(InMemoryKnowledgeGraph::new());
        let tracker = TemporalTracker::new(graph.clone(), PerfThresholds::default());
        let rollback = RollbackManager::new(
            RollbackStore::new(StoreConfig::default()),
            SnapshotStore::new(10 * 1024 * 1024),
            graph,
            Arc::new(InMemorySessionManager::new()),
            Arc::new(InMemoryDatabase::new(true)),
            None,
            Arc::new(NullTarget),
            RollbackConfig::default(),
        );

        let result = maybe_checkpoint(
            &tracker,
            &rollback,
            &suite_with_failure(),
            IncidentCheckpointConfig::default(),
            Utc::now(),
        )
        .await
        .unwrap();
        assert!(result.is_some());
    }
}
