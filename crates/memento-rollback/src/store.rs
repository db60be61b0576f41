//! LRU+TTL container for rollback points and operations.
//!
//! Two maps — rollback points and operations — each bounded by
//! `max_items` with insertion-and-access recency (LRU-by-access). TTL is
//! enforced lazily on [`RollbackStore::get_point`] and eagerly by
//! [`RollbackStore::cleanup`], which a caller runs on a `cleanup_interval`
//! tick.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::error::{Result, RollbackError};
use crate::lru::LruMap;
use crate::types::{OperationId, OperationStatus, RollbackOperation, RollbackPoint};
use memento_snapshot::RollbackPointId;

/// Lifecycle events emitted by [`RollbackStore`].
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// A rollback point was inserted.
    RollbackPointStored {
        /// The stored point's ID.
        id: RollbackPointId,
    },
    /// A rollback point was explicitly removed.
    RollbackPointRemoved {
        /// The removed point's ID.
        id: RollbackPointId,
    },
    /// A rollback point was evicted because its TTL elapsed.
    RollbackPointExpired {
        /// The expired point's ID.
        id: RollbackPointId,
    },
    /// A [`RollbackStore::cleanup`] pass completed.
    CleanupCompleted {
        /// Expired rollback points removed.
        removed_points: usize,
        /// Stale completed operations removed.
        removed_operations: usize,
    },
    /// [`RollbackStore::clear`] was called.
    StoreCleared,
    /// [`RollbackStore::shutdown`] was called.
    StoreShutdown,
}

/// Default capacity for lifecycle event subscribers.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long a completed operation is retained before [`RollbackStore::cleanup`]
/// reaps it.
pub const OPERATION_RETENTION: chrono::Duration = chrono::Duration::hours(24);

/// Configuration for a [`RollbackStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum rollback points and operations each held concurrently.
    pub max_items: usize,
    /// Default TTL applied to a point created without an explicit
    /// `expires_at`.
    pub default_ttl: chrono::Duration,
    /// How often an external caller should invoke [`RollbackStore::cleanup`].
    pub cleanup_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_items: 50,
            default_ttl: chrono::Duration::hours(24),
            cleanup_interval: Duration::from_secs(5 * 60),
        }
    }
}

struct Maps {
    points: LruMap<RollbackPointId, RollbackPoint>,
    operations: LruMap<OperationId, RollbackOperation>,
}

/// LRU+TTL store for rollback points and operations.
pub struct RollbackStore {
    maps: parking_lot::Mutex<Maps>,
    config: StoreConfig,
    events: broadcast::Sender<StoreEvent>,
}

impl RollbackStore {
    /// Creates a store with the given configuration.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CHANNEL_CAPACITY);
        Self {
            maps: parking_lot::Mutex::new(Maps {
                points: LruMap::new(config.max_items),
                operations: LruMap::new(config.max_items),
            }),
            config,
            events,
        }
    }

    /// Subscribes to lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        let _ = self.events.send(event);
    }

    /// Inserts or replaces a rollback point, applying the store's default
    /// TTL if the point has no explicit `expires_at`.
    pub fn put_point(&self, mut point: RollbackPoint) {
        if point.expires_at.is_none() {
            point.expires_at = Some(point.timestamp + self.config.default_ttl);
        }
        let id = point.id.clone();
        let mut maps = self.maps.lock();
        maps.points.insert(id.clone(), point);
        drop(maps);
        self.emit(StoreEvent::RollbackPointStored { id });
    }

    /// Fetches a rollback point, touching its recency on hit and raising
    /// [`RollbackError::RollbackPointExpired`] (and evicting it) if its
    /// TTL has elapsed.
    ///
    /// # Errors
    ///
    /// Returns [`RollbackError::RollbackPointNotFound`] if no such point
    /// exists, or [`RollbackError::RollbackPointExpired`] if it has
    /// expired.
    pub fn get_point(&self, id: &RollbackPointId, now: DateTime<Utc>) -> Result<RollbackPoint> {
        let mut maps = self.maps.lock();
        let expired = matches!(maps.points.peek(id), Some(p) if p.is_expired(now));
        if expired {
            maps.points.remove(id);
            drop(maps);
            self.emit(StoreEvent::RollbackPointExpired { id: id.clone() });
            return Err(RollbackError::RollbackPointExpired { id: id.to_string() });
        }
        maps.points
            .get_touch(id)
            .cloned()
            .ok_or_else(|| RollbackError::RollbackPointNotFound { id: id.to_string() })
    }

    /// Removes a rollback point. Returns `true` if one was present.
    pub fn remove_point(&self, id: &RollbackPointId) -> bool {
        let removed = self.maps.lock().points.remove(id).is_some();
        if removed {
            self.emit(StoreEvent::RollbackPointRemoved { id: id.clone() });
        }
        removed
    }

    /// The number of rollback points currently held, without touching
    /// recency or checking expiry.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.maps.lock().points.len()
    }

    /// Every rollback-point ID currently held, regardless of expiry
    /// status. Used by the snapshot store's orphan-reaping `cleanup()`.
    #[must_use]
    pub fn live_point_ids(&self) -> std::collections::HashSet<RollbackPointId> {
        self.maps
            .lock()
            .points
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Inserts or replaces an operation.
    pub fn put_operation(&self, operation: RollbackOperation) {
        let id = operation.id.clone();
        self.maps.lock().operations.insert(id, operation);
    }

    /// Fetches an operation by ID, touching its recency.
    #[must_use]
    pub fn get_operation(&self, id: &OperationId) -> Option<RollbackOperation> {
        self.maps.lock().operations.get_touch(id).cloned()
    }

    /// Removes expired rollback points and completed/failed/cancelled
    /// operations older than [`OPERATION_RETENTION`].
    pub fn cleanup(&self, now: DateTime<Utc>) -> (usize, usize) {
        let (removed_points, removed_operations) = {
            let mut maps = self.maps.lock();
            let removed_points = maps.points.retain_remove(|_, p| p.is_expired(now));
            let removed_operations = maps.operations.retain_remove(|_, op| {
                op.status.is_terminal()
                    && op
                        .completed_at
                        .is_some_and(|completed| now - completed > OPERATION_RETENTION)
            });
            (removed_points.len(), removed_operations.len())
        };
        // A bulk sweep emits one aggregate CleanupCompleted event rather
        // than a RollbackPointExpired per point.
        self.emit(StoreEvent::CleanupCompleted {
            removed_points,
            removed_operations,
        });
        (removed_points, removed_operations)
    }

    /// Removes every rollback point and operation.
    pub fn clear(&self) {
        let mut maps = self.maps.lock();
        maps.points.clear();
        maps.operations.clear();
        drop(maps);
        self.emit(StoreEvent::StoreCleared);
    }

    /// Signals shutdown to subscribers. Does not clear stored state.
    pub fn shutdown(&self) {
        self.emit(StoreEvent::StoreShutdown);
    }

    /// This store's configuration.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OperationType, StrategyKind};

    fn point(id: &str, now: DateTime<Utc>) -> RollbackPoint {
        RollbackPoint::new(RollbackPointId::new(id), id, now)
    }

    #[test]
    fn lru_eviction_drops_least_recently_accessed() {
        let store = RollbackStore::new(StoreConfig {
            max_items: 2,
            ..StoreConfig::default()
        });
        let now = Utc::now();
        store.put_point(point("p1", now));
        store.put_point(point("p2", now));
        store.get_point(&RollbackPointId::new("p1"), now).unwrap();
        store.put_point(point("p3", now));

        assert!(store.get_point(&RollbackPointId::new("p2"), now).is_err());
        assert!(store.get_point(&RollbackPointId::new("p1"), now).is_ok());
        assert!(store.get_point(&RollbackPointId::new("p3"), now).is_ok());
    }

    #[test]
    fn ttl_expiry_raises_error_and_evicts() {
        let store = RollbackStore::new(StoreConfig::default());
        let now = Utc::now();
        let mut p = point("p1", now);
        p.expires_at = Some(now + chrono::Duration::milliseconds(100));
        store.put_point(p);

        let later = now + chrono::Duration::milliseconds(150);
        let result = store.get_point(&RollbackPointId::new("p1"), later);
        assert!(matches!(
            result,
            Err(RollbackError::RollbackPointExpired { .. })
        ));
        assert_eq!(store.point_count(), 0);
    }

    #[test]
    fn cleanup_removes_expired_points_and_stale_operations() {
        let store = RollbackStore::new(StoreConfig::default());
        let now = Utc::now();
        let mut p = point("p1", now);
        p.expires_at = Some(now - chrono::Duration::seconds(1));
        store.put_point(p);

        let mut op = RollbackOperation::new(
            OperationType::Full,
            RollbackPointId::new("p1"),
            StrategyKind::Immediate,
            now - chrono::Duration::hours(25),
        );
        op.finish(OperationStatus::Completed, now - chrono::Duration::hours(25));
        store.put_operation(op);

        let (removed_points, removed_operations) = store.cleanup(now);
        assert_eq!(removed_points, 1);
        assert_eq!(removed_operations, 1);
    }

    #[test]
    fn put_point_applies_default_ttl_when_unset() {
        let store = RollbackStore::new(StoreConfig {
            default_ttl: chrono::Duration::milliseconds(50),
            ..StoreConfig::default()
        });
        let now = Utc::now();
        store.put_point(point("p1", now));
        let later = now + chrono::Duration::milliseconds(100);
        assert!(store.get_point(&RollbackPointId::new("p1"), later).is_err());
    }

    #[tokio::test]
    async fn subscribers_observe_store_events() {
        let store = RollbackStore::new(StoreConfig::default());
        let mut rx = store.subscribe();
        store.put_point(point("p1", Utc::now()));
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, StoreEvent::RollbackPointStored { .. }));
    }
}
