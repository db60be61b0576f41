//! Rollback-manager and rollback-store configuration.
//!
//! These mirror `memento_rollback::RollbackConfig` and
//! `memento_rollback::StoreConfig` field-for-field but stay serde-shaped
//! (durations as seconds, sizes as bytes) so they round-trip through a
//! config file; callers convert with [`RollbackSettings::cleanup_interval`]
//! and friends before handing them to the rollback crate's constructors.

use serde::{Deserialize, Serialize};

fn default_max_rollback_points() -> usize {
    50
}

fn default_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_cleanup_interval_secs() -> u64 {
    5 * 60
}

fn default_max_snapshot_size() -> usize {
    10 * 1024 * 1024
}

fn default_persistence_type() -> String {
    "memory".to_string()
}

/// Rollback-manager level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollbackSettings {
    /// Maximum rollback points held concurrently before LRU eviction.
    pub max_rollback_points: usize,
    /// Default TTL, in seconds, applied to a point created without an
    /// explicit expiry.
    pub default_ttl_secs: u64,
    /// Whether the store runs its background expiry sweep.
    pub auto_cleanup: bool,
    /// Interval, in seconds, between background cleanup sweeps.
    pub cleanup_interval_secs: u64,
    /// Ceiling, in bytes, on a single snapshot's serialized size.
    pub max_snapshot_size: usize,
    /// Whether rollback points/snapshots are persisted beyond memory.
    pub enable_persistence: bool,
    /// Persistence backend identifier. Only `"memory"` is implemented;
    /// other values are accepted but rejected at startup by the binary
    /// wiring them up.
    pub persistence_type: String,
    /// Whether rollback-point creation requires
    /// `DatabaseService::is_ready()` to return `true` first.
    pub require_database_ready: bool,
}

impl Default for RollbackSettings {
    fn default() -> Self {
        Self {
            max_rollback_points: default_max_rollback_points(),
            default_ttl_secs: default_ttl_secs(),
            auto_cleanup: true,
            cleanup_interval_secs: default_cleanup_interval_secs(),
            max_snapshot_size: default_max_snapshot_size(),
            enable_persistence: false,
            persistence_type: default_persistence_type(),
            require_database_ready: true,
        }
    }
}

impl RollbackSettings {
    /// The default TTL as a [`chrono::Duration`].
    #[must_use]
    pub fn default_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.default_ttl_secs).unwrap_or(i64::MAX))
    }

    /// The cleanup sweep interval as a [`std::time::Duration`].
    #[must_use]
    pub const fn cleanup_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cleanup_interval_secs)
    }
}

/// Standalone rollback-store (LRU+TTL container) settings. Distinct from
/// [`RollbackSettings`]: these are two separate configuration blocks with
/// overlapping but not identical fields (the store block adds
/// `enable_lru`, the manager block adds persistence/database gating).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Maximum rollback points and operations held concurrently.
    pub max_items: usize,
    /// Default TTL, in seconds, for points created without an explicit
    /// expiry.
    pub default_ttl_secs: u64,
    /// Whether eviction follows least-recently-accessed order. The store
    /// only implements LRU eviction; `false` is accepted for
    /// configuration-shape compatibility but is not a supported mode.
    pub enable_lru: bool,
    /// Whether the store persists beyond memory.
    pub enable_persistence: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            max_items: default_max_rollback_points(),
            default_ttl_secs: default_ttl_secs(),
            enable_lru: true,
            enable_persistence: false,
        }
    }
}

impl StoreSettings {
    /// The default TTL as a [`chrono::Duration`].
    #[must_use]
    pub fn default_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.default_ttl_secs).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_settings_defaults_match_spec() {
        let settings = RollbackSettings::default();
        assert_eq!(settings.max_rollback_points, 50);
        assert_eq!(settings.default_ttl_secs, 24 * 60 * 60);
        assert!(settings.auto_cleanup);
        assert_eq!(settings.cleanup_interval_secs, 5 * 60);
        assert_eq!(settings.max_snapshot_size, 10 * 1024 * 1024);
        assert!(!settings.enable_persistence);
        assert_eq!(settings.persistence_type, "memory");
        assert!(settings.require_database_ready);
    }

    #[test]
    fn store_settings_defaults_match_spec() {
        let settings = StoreSettings::default();
        assert_eq!(settings.max_items, 50);
        assert!(settings.enable_lru);
        assert!(!settings.enable_persistence);
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let settings: RollbackSettings = serde_json::from_str("{}").expect("empty object");
        assert_eq!(settings, RollbackSettings::default());
    }
}
