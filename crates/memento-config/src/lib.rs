//! Central configuration structs for the Memento workspace.
//!
//! A plain, `serde(default)`-annotated struct tree loaded from an
//! optional JSON file, with layered overrides. Most of this config is not
//! meant to be edited by hand in production — the temporal thresholds and
//! incident gates are env-driven; [`MementoConfig::from_env`] layers those
//! over [`MementoConfig::default`] the same way
//! `memento_temporal::PerfThresholds::from_env` and
//! `memento_temporal::IncidentCheckpointConfig::from_env` do, so a single
//! call produces the config a binary needs without duplicating each
//! crate's own env-loading logic.
//!
//! # Modules
//!
//! - [`rollback`]: rollback-manager and rollback-store settings.
//! - [`pipeline`]: event bus, worker, batching, queue, and monitoring
//!   settings.
//! - [`temporal`]: performance-regression thresholds and incident-
//!   checkpoint gates.
//! - [`error`]: the crate's error taxonomy.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod pipeline;
pub mod rollback;
pub mod temporal;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use error::{ConfigError, Result};
pub use pipeline::{
    AlertThresholds, BatchingSettings, EventBusKind, EventBusSettings, MonitoringSettings,
    PipelineSettings, QueuesSettings, WorkersSettings,
};
pub use rollback::{RollbackSettings, StoreSettings};
pub use temporal::{IncidentSettings, TemporalSettings};

/// The full Memento configuration tree.
///
/// Every field carries a sensible default via `#[serde(default)]`, so a
/// config file only needs to name the fields it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MementoConfig {
    /// Rollback-manager settings.
    pub rollback: RollbackSettings,
    /// Standalone rollback-store settings.
    pub store: StoreSettings,
    /// Ingestion pipeline settings.
    pub pipeline: PipelineSettings,
    /// Performance-regression detection thresholds.
    pub temporal: TemporalSettings,
    /// Incident-checkpoint gates.
    pub incident: IncidentSettings,
}

impl Default for MementoConfig {
    fn default() -> Self {
        Self {
            rollback: RollbackSettings::default(),
            store: StoreSettings::default(),
            pipeline: PipelineSettings::default(),
            temporal: TemporalSettings::default(),
            incident: IncidentSettings::default(),
        }
    }
}

impl MementoConfig {
    /// Loads configuration from a JSON file, falling back to
    /// [`MementoConfig::default`] for any field the file omits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if its contents are not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Loads configuration from an optional file, falling back to
    /// [`MementoConfig::default`] if no path is given.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`MementoConfig::load`] when `path` is
    /// `Some`.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Builds a config by layering environment-variable overrides for the
    /// temporal thresholds and incident-checkpoint gates on
    /// top of a base config. All other sections are left as given: only
    /// those two groups are env-driven, everything else comes from a
    /// config file or CLI flags.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        self.temporal = env_temporal(self.temporal);
        self.incident = env_incident(self.incident);
        self
    }

    /// Builds a config entirely from defaults plus environment-variable
    /// overrides, with no config file.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_u8(key: &str) -> Option<u8> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().and_then(|v| match v.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    })
}

fn env_temporal(defaults: TemporalSettings) -> TemporalSettings {
    TemporalSettings {
        p95_impact_ms: env_f64("PERF_IMPACT_P95_MS").unwrap_or(defaults.p95_impact_ms),
        avg_impact_ms: env_f64("PERF_IMPACT_AVG_MS").unwrap_or(defaults.avg_impact_ms),
        degrading_min_delta_ms: env_f64("PERF_DEGRADING_MIN_DELTA_MS")
            .unwrap_or(defaults.degrading_min_delta_ms),
        trend_min_runs: env_usize("PERF_TREND_MIN_RUNS").unwrap_or(defaults.trend_min_runs),
        min_history: env_usize("PERF_MIN_HISTORY").unwrap_or(defaults.min_history),
    }
}

fn env_incident(defaults: IncidentSettings) -> IncidentSettings {
    IncidentSettings {
        history_enabled: env_bool("HISTORY_ENABLED").unwrap_or(defaults.history_enabled),
        incident_enabled: env_bool("HISTORY_INCIDENT_ENABLED")
            .unwrap_or(defaults.incident_enabled),
        hops: env_u8("HISTORY_INCIDENT_HOPS")
            .or_else(|| env_u8("HISTORY_CHECKPOINT_HOPS"))
            .unwrap_or(defaults.hops),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = MementoConfig::default();
        assert_eq!(config.rollback.max_rollback_points, 50);
        assert_eq!(config.pipeline.queues.partition_count, 16);
        assert_eq!(config.temporal.trend_min_runs, 5);
        assert!(config.incident.history_enabled);
    }

    #[test]
    fn load_missing_file_errors() {
        let result = MementoConfig::load(Path::new("/nonexistent/memento.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn load_invalid_json_errors() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(b"not json").expect("write");
        let result = MementoConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(br#"{"rollback": {"max_rollback_points": 10}}"#)
            .expect("write");
        let config = MementoConfig::load(file.path()).expect("load");
        assert_eq!(config.rollback.max_rollback_points, 10);
        assert_eq!(config.rollback.max_snapshot_size, 10 * 1024 * 1024);
        assert_eq!(config.pipeline, PipelineSettings::default());
    }

    #[test]
    fn load_or_default_with_none_returns_defaults() {
        let config = MementoConfig::load_or_default(None).expect("load_or_default");
        assert_eq!(config, MementoConfig::default());
    }

    #[test]
    fn env_helpers_fall_back_to_defaults_when_unset() {
        // Exercises the fallback path without mutating process-wide env
        // state (parallel tests would race on shared keys).
        let temporal = env_temporal(TemporalSettings::default());
        assert_eq!(temporal, TemporalSettings::default());
        let incident = env_incident(IncidentSettings::default());
        assert_eq!(incident, IncidentSettings::default());
    }

    #[test]
    fn with_env_overrides_only_touches_temporal_and_incident_sections() {
        let config = MementoConfig::default().with_env_overrides();
        assert_eq!(config.rollback, RollbackSettings::default());
        assert_eq!(config.pipeline, PipelineSettings::default());
        assert_eq!(config.store, StoreSettings::default());
    }
}
