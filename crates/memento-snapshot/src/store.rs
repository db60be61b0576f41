//! The snapshot store.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use memento_core::CanonicalValue;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use crate::error::{Result, SnapshotError};

/// Unique identifier for a stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct SnapshotId(String);

impl SnapshotId {
    /// Wraps a raw ID string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for the rollback point a snapshot belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct RollbackPointId(String);

impl RollbackPointId {
    /// Wraps a raw ID string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RollbackPointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One captured subsystem's state at a rollback point.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    /// Generated snapshot ID.
    pub id: SnapshotId,
    /// The rollback point this snapshot belongs to.
    pub rollback_point_id: RollbackPointId,
    /// The snapshot's type (`entity`, `relationship`, `session_state`,
    /// `file_system`, or a caller-defined string).
    pub snapshot_type: String,
    /// The captured data, in canonical (tagged) form.
    pub data: CanonicalValue,
    /// Bytes of the canonical serialization of `data`.
    pub size: usize,
    /// When this snapshot was captured.
    pub created_at: DateTime<Utc>,
    /// SHA-256 over the canonical serialization, for integrity checks.
    pub checksum: String,
}

fn canonical_bytes(data: &CanonicalValue) -> Result<Vec<u8>> {
    serde_json::to_vec(data).map_err(|err| SnapshotError::Corrupted {
        id: format!("<unserializable: {err}>"),
    })
}

fn checksum_of(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// An identifier source for new snapshots. Production code uses a UUID- or
/// monotonic-counter-backed generator; tests typically use a deterministic
/// sequence.
pub trait SnapshotIdGenerator: Send + Sync {
    /// Produces the next snapshot ID.
    fn next_id(&self) -> SnapshotId;
}

/// A generator producing IDs from a monotonically increasing counter,
/// prefixed `snap-`.
#[derive(Debug, Default)]
pub struct CounterIdGenerator {
    counter: std::sync::atomic::AtomicU64,
}

impl SnapshotIdGenerator for CounterIdGenerator {
    fn next_id(&self) -> SnapshotId {
        let n = self
            .counter
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        SnapshotId::new(format!("snap-{n}"))
    }
}

struct Inner {
    snapshots: HashMap<SnapshotId, Snapshot>,
    by_point: HashMap<RollbackPointId, HashSet<SnapshotId>>,
    total_size: usize,
}

/// Holds typed snapshots keyed by rollback-point ID, enforcing a size
/// ceiling and verifying integrity on every read.
pub struct SnapshotStore<G: SnapshotIdGenerator = CounterIdGenerator> {
    inner: RwLock<Inner>,
    max_snapshot_size: usize,
    id_generator: G,
}

impl SnapshotStore<CounterIdGenerator> {
    /// Creates a store with the default counter-backed ID generator.
    #[must_use]
    pub fn new(max_snapshot_size: usize) -> Self {
        Self::with_id_generator(max_snapshot_size, CounterIdGenerator::default())
    }
}

impl<G: SnapshotIdGenerator> SnapshotStore<G> {
    /// Creates a store with a custom ID generator.
    #[must_use]
    pub fn with_id_generator(max_snapshot_size: usize, id_generator: G) -> Self {
        Self {
            inner: RwLock::new(Inner {
                snapshots: HashMap::new(),
                by_point: HashMap::new(),
                total_size: 0,
            }),
            max_snapshot_size,
            id_generator,
        }
    }

    /// Deep-clones and serializes `data` to canonical form, rejecting it if
    /// the serialization would exceed `max_snapshot_size`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::TooLarge`] when the serialized size exceeds
    /// the configured ceiling.
    pub fn create(
        &self,
        rollback_point_id: RollbackPointId,
        snapshot_type: impl Into<String>,
        data: CanonicalValue,
        created_at: DateTime<Utc>,
    ) -> Result<Snapshot> {
        let bytes = canonical_bytes(&data)?;
        let size = bytes.len();
        if size > self.max_snapshot_size {
            return Err(SnapshotError::TooLarge {
                size,
                max: self.max_snapshot_size,
            });
        }
        let checksum = checksum_of(&bytes);
        let id = self.id_generator.next_id();
        let snapshot = Snapshot {
            id: id.clone(),
            rollback_point_id: rollback_point_id.clone(),
            snapshot_type: snapshot_type.into(),
            data,
            size,
            created_at,
            checksum,
        };

        let mut inner = self.inner.write();
        inner
            .by_point
            .entry(rollback_point_id)
            .or_default()
            .insert(id.clone());
        inner.total_size += size;
        inner.snapshots.insert(id, snapshot.clone());
        tracing::debug!(snapshot_id = %snapshot.id, size, "snapshot created");
        Ok(snapshot)
    }

    /// Fetches a snapshot by ID, verifying its checksum.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::NotFound`] if no such snapshot exists, or
    /// [`SnapshotError::Corrupted`] if the checksum no longer matches.
    pub fn get(&self, id: &SnapshotId) -> Result<Snapshot> {
        let inner = self.inner.read();
        let snapshot = inner
            .snapshots
            .get(id)
            .ok_or_else(|| SnapshotError::NotFound { id: id.to_string() })?;
        let bytes = canonical_bytes(&snapshot.data)?;
        if checksum_of(&bytes) != snapshot.checksum {
            return Err(SnapshotError::Corrupted { id: id.to_string() });
        }
        Ok(snapshot.clone())
    }

    /// Restores a snapshot's captured data, verifying its checksum first.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get`].
    pub fn restore(&self, id: &SnapshotId) -> Result<CanonicalValue> {
        self.get(id).map(|s| s.data)
    }

    /// Deletes a single snapshot, updating the size counter and reverse
    /// index. Returns `true` if a snapshot was removed.
    pub fn delete(&self, id: &SnapshotId) -> bool {
        let mut inner = self.inner.write();
        let Some(snapshot) = inner.snapshots.remove(id) else {
            return false;
        };
        inner.total_size = inner.total_size.saturating_sub(snapshot.size);
        if let Some(set) = inner.by_point.get_mut(&snapshot.rollback_point_id) {
            set.remove(id);
            if set.is_empty() {
                inner.by_point.remove(&snapshot.rollback_point_id);
            }
        }
        true
    }

    /// Deletes every snapshot owned by `rollback_point_id`. Returns the
    /// number of snapshots removed.
    pub fn delete_for_point(&self, rollback_point_id: &RollbackPointId) -> usize {
        let ids: Vec<SnapshotId> = {
            let inner = self.inner.read();
            inner
                .by_point
                .get(rollback_point_id)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default()
        };
        let mut removed = 0;
        for id in &ids {
            if self.delete(id) {
                removed += 1;
            }
        }
        removed
    }

    /// Deletes snapshots no longer referenced by any rollback point (i.e.
    /// orphans left behind by LRU eviction of their owning point).
    ///
    /// `live_points` must list every rollback-point ID the rollback store
    /// still holds.
    pub fn cleanup(&self, live_points: &HashSet<RollbackPointId>) -> usize {
        let orphan_ids: Vec<SnapshotId> = {
            let inner = self.inner.read();
            inner
                .snapshots
                .values()
                .filter(|s| !live_points.contains(&s.rollback_point_id))
                .map(|s| s.id.clone())
                .collect()
        };
        let mut removed = 0;
        for id in &orphan_ids {
            if self.delete(id) {
                removed += 1;
            }
        }
        removed
    }

    /// The sum of `size` over every currently stored snapshot.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.inner.read().total_size
    }

    /// The number of snapshots currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().snapshots.len()
    }

    /// Whether the store holds no snapshots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The snapshot IDs owned by a given rollback point.
    #[must_use]
    pub fn snapshot_ids_for_point(&self, rollback_point_id: &RollbackPointId) -> Vec<SnapshotId> {
        self.inner
            .read()
            .by_point
            .get(rollback_point_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Computes the structural diff between two snapshots' captured data
///.
///
/// # Errors
///
/// Returns [`SnapshotError::TypeMismatch`] if `from` and `to` have
/// different `snapshot_type`s; diffing across types is meaningless since
/// their data shapes aren't comparable.
pub fn diff_snapshots(
    from: &Snapshot,
    to: &Snapshot,
    options: &memento_core::DiffOptions,
) -> Result<Vec<memento_core::DiffEntry>> {
    if from.snapshot_type != to.snapshot_type {
        return Err(SnapshotError::TypeMismatch {
            expected: from.snapshot_type.clone(),
            actual: to.snapshot_type.clone(),
        });
    }
    Ok(memento_core::generate_object_diff(
        &from.data, &to.data, options,
    ))
}

#[cfg(test)]
mod diff_tests {
    use super::*;
    use indexmap::IndexMap;

    fn value(name: &str) -> CanonicalValue {
        CanonicalValue::Object(IndexMap::from([(
            "name".to_string(),
            CanonicalValue::String(name.to_string()),
        )]))
    }

    #[test]
    fn diff_snapshots_rejects_mismatched_types() {
        let store = SnapshotStore::new(1024);
        let a = store
            .create(RollbackPointId::new("p1"), "entity", value("A"), Utc::now())
            .unwrap();
        let b = store
            .create(
                RollbackPointId::new("p1"),
                "relationship",
                value("B"),
                Utc::now(),
            )
            .unwrap();
        let result = diff_snapshots(&a, &b, &memento_core::DiffOptions::default());
        assert!(matches!(result, Err(SnapshotError::TypeMismatch { .. })));
    }

    #[test]
    fn diff_snapshots_same_type_produces_entries() {
        let store = SnapshotStore::new(1024);
        let a = store
            .create(RollbackPointId::new("p1"), "entity", value("A"), Utc::now())
            .unwrap();
        let b = store
            .create(RollbackPointId::new("p1"), "entity", value("B"), Utc::now())
            .unwrap();
        let entries = diff_snapshots(&a, &b, &memento_core::DiffOptions::default()).unwrap();
        assert_eq!(entries.len(), 1);
    }
}
