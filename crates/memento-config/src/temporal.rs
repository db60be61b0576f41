//! Temporal tracker thresholds and incident-checkpoint gates.
//!
//! These are env-driven in the source system; `memento_temporal` already
//! loads its own `PerfThresholds::from_env`/`IncidentCheckpointConfig::from_env`
//! independently (see that crate), so the settings here exist for the
//! config file/CLI surface — a binary that wants one place to read or
//! print the full configuration, rather than querying each crate's `env`
//! loader separately. Field names mirror `memento_temporal` exactly so a
//! caller can map one onto the other without translation.

use serde::{Deserialize, Serialize};

fn default_p95_impact_ms() -> f64 {
    2_000.0
}

fn default_avg_impact_ms() -> f64 {
    1_000.0
}

fn default_degrading_min_delta_ms() -> f64 {
    50.0
}

fn default_trend_min_runs() -> usize {
    5
}

fn default_min_history() -> usize {
    10
}

/// Performance-regression detection thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalSettings {
    /// p95 duration above which `PERFORMANCE_IMPACT` is raised regardless
    /// of trend.
    pub p95_impact_ms: f64,
    /// Average duration above which `PERFORMANCE_IMPACT` is raised
    /// regardless of trend.
    pub avg_impact_ms: f64,
    /// Minimum absolute delta, in milliseconds, for a trend to be
    /// classified as degrading/improving.
    pub degrading_min_delta_ms: f64,
    /// Consecutive runs of sustained, monotone increase required before
    /// `PERFORMANCE_REGRESSION` fires.
    pub trend_min_runs: usize,
    /// Minimum executions required before trend detection runs at all.
    pub min_history: usize,
}

impl Default for TemporalSettings {
    fn default() -> Self {
        Self {
            p95_impact_ms: default_p95_impact_ms(),
            avg_impact_ms: default_avg_impact_ms(),
            degrading_min_delta_ms: default_degrading_min_delta_ms(),
            trend_min_runs: default_trend_min_runs(),
            min_history: default_min_history(),
        }
    }
}

/// Incident-checkpoint gates and hop count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentSettings {
    /// Master switch for test-history tracking as a whole.
    pub history_enabled: bool,
    /// Switch for the incident-checkpoint behavior specifically.
    pub incident_enabled: bool,
    /// Relationship hops to expand from the failing tests' seed entities.
    pub hops: u8,
}

impl Default for IncidentSettings {
    fn default() -> Self {
        Self {
            history_enabled: true,
            incident_enabled: true,
            hops: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporal_settings_defaults_match_spec() {
        let settings = TemporalSettings::default();
        assert!((settings.p95_impact_ms - 2_000.0).abs() < f64::EPSILON);
        assert_eq!(settings.trend_min_runs, 5);
        assert_eq!(settings.min_history, 10);
    }

    #[test]
    fn incident_settings_defaults_match_spec() {
        let settings = IncidentSettings::default();
        assert!(settings.history_enabled);
        assert!(settings.incident_enabled);
        assert_eq!(settings.hops, 2);
    }
}
