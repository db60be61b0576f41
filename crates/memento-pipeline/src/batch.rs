//! Batch accumulation, dependency ordering, and idempotent streaming
//! writes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;

use crate::error::{PipelineError, Result};

/// A single parsed unit awaiting batching.
#[derive(Debug, Clone)]
pub struct Fragment {
    /// Unique fragment ID.
    pub id: String,
    /// What kind of batch this fragment belongs in.
    pub fragment_type: FragmentType,
    /// IDs of fragments that must be written before this one.
    pub dependencies: Vec<String>,
    /// The ingestion epoch this fragment belongs to; batches never span
    /// epoch boundaries.
    pub epoch_id: u64,
    /// The fragment's payload.
    pub payload: Value,
}

/// Which per-type batch a [`Fragment`] accumulates into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentType {
    /// Entity upserts.
    Entity,
    /// Relationship upserts.
    Relationship,
    /// Embedding writes.
    Embedding,
}

/// Tunables for a [`BatchCoordinator`].
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum fragments per entity batch before a flush is forced.
    pub entity_batch_size: usize,
    /// Maximum fragments per relationship batch before a flush is forced.
    pub relationship_batch_size: usize,
    /// Maximum fragments per embedding batch before a flush is forced.
    pub embedding_batch_size: usize,
    /// Maximum time a fragment waits in an unflushed batch.
    pub timeout: Duration,
    /// How long a batch ID is remembered for idempotent-write dedup.
    pub idempotency_key_ttl: Duration,
    /// Maximum attempts before a batch is abandoned.
    pub max_attempts: u32,
    /// Multiplier applied to the backoff delay after each failed attempt.
    pub backoff_multiplier: f64,
    /// Ceiling on the backoff delay between attempts.
    pub max_backoff: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            entity_batch_size: 200,
            relationship_batch_size: 200,
            embedding_batch_size: 64,
            timeout: Duration::from_millis(500),
            idempotency_key_ttl: Duration::from_secs(10 * 60),
            max_attempts: 3,
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl BatchConfig {
    fn capacity_for(&self, fragment_type: FragmentType) -> usize {
        match fragment_type {
            FragmentType::Entity => self.entity_batch_size,
            FragmentType::Relationship => self.relationship_batch_size,
            FragmentType::Embedding => self.embedding_batch_size,
        }
    }
}

/// A flushed, dependency-ordered group of fragments ready to write.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Unique batch ID.
    pub id: String,
    /// The ingestion epoch every fragment in this batch belongs to.
    pub epoch_id: u64,
    /// The fragment type shared by every item.
    pub fragment_type: FragmentType,
    /// Fragments in dependency order (a fragment never precedes one it
    /// depends on, except within a detected cycle).
    pub items: Vec<Fragment>,
    /// When this batch was assembled.
    pub created_at: DateTime<Utc>,
}

/// Outcome of writing a batch: how many items succeeded, and why the
/// rest failed.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Number of fragments successfully written.
    pub processed: usize,
    /// Number of fragments that failed.
    pub failed: usize,
    /// Per-failure reasons, one per failed fragment.
    pub reasons: Vec<String>,
}

struct PendingBatch {
    fragments: Vec<Fragment>,
    opened_at: DateTime<Utc>,
}

/// Accumulates [`Fragment`]s into per-type, per-epoch [`Batch`]es, orders
/// each batch's fragments topologically by dependency, and dedups
/// repeated writes of the same batch ID within `idempotency_key_ttl`.
pub struct BatchCoordinator {
    config: BatchConfig,
    pending: parking_lot::Mutex<HashMap<(FragmentType, u64), PendingBatch>>,
    seen_batch_ids: DashMap<String, DateTime<Utc>>,
    next_batch_seq: std::sync::atomic::AtomicU64,
}

impl BatchCoordinator {
    /// Builds a coordinator with the given configuration.
    #[must_use]
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            pending: parking_lot::Mutex::new(HashMap::new()),
            seen_batch_ids: DashMap::new(),
            next_batch_seq: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Adds a fragment to its type/epoch's pending batch. Returns a
    /// flushed [`Batch`] if the addition crossed the type's size cap.
    pub fn add(&self, fragment: Fragment, now: DateTime<Utc>) -> Option<Batch> {
        let key = (fragment.fragment_type, fragment.epoch_id);
        let cap = self.config.capacity_for(fragment.fragment_type);
        let mut pending = self.pending.lock();
        let entry = pending.entry(key).or_insert_with(|| PendingBatch {
            fragments: Vec::new(),
            opened_at: now,
        });
        entry.fragments.push(fragment);
        if entry.fragments.len() >= cap {
            let batch = pending.remove(&key).map(|p| self.finalize(key, p, now));
            return batch;
        }
        None
    }

    /// Flushes every pending batch whose `timeout` has elapsed or whose
    /// epoch no longer matches `current_epoch`, regardless of size.
    pub fn flush_due(&self, now: DateTime<Utc>, current_epoch: u64) -> Vec<Batch> {
        let mut pending = self.pending.lock();
        let due: Vec<(FragmentType, u64)> = pending
            .iter()
            .filter(|(&(_, epoch), batch)| {
                epoch != current_epoch
                    || now.signed_duration_since(batch.opened_at)
                        >= chrono::Duration::from_std(self.config.timeout).unwrap_or_default()
            })
            .map(|(&key, _)| key)
            .collect();
        due.into_iter()
            .filter_map(|key| pending.remove(&key).map(|p| self.finalize(key, p, now)))
            .collect()
    }

    /// Flushes every pending batch unconditionally, draining the
    /// coordinator. Used on shutdown.
    pub fn flush_all(&self, now: DateTime<Utc>) -> Vec<Batch> {
        let mut pending = self.pending.lock();
        let drained: Vec<_> = pending.drain().collect();
        drained
            .into_iter()
            .map(|(key, p)| self.finalize(key, p, now))
            .collect()
    }

    fn finalize(&self, key: (FragmentType, u64), pending: PendingBatch, now: DateTime<Utc>) -> Batch {
        let (fragment_type, epoch_id) = key;
        let ordered = topological_order(pending.fragments);
        let seq = self
            .next_batch_seq
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Batch {
            id: format!("batch-{epoch_id}-{}-{seq}", fragment_type.label()),
            epoch_id,
            fragment_type,
            items: ordered,
            created_at: now,
        }
    }

    /// Returns `true`, and remembers the ID, the first time a batch ID is
    /// seen within `idempotency_key_ttl`; returns `false` on a repeat
    /// delivery so the caller can skip re-writing it.
    pub fn claim_for_write(&self, batch_id: &str, now: DateTime<Utc>) -> bool {
        self.prune_idempotency_keys(now);
        if self.seen_batch_ids.contains_key(batch_id) {
            return false;
        }
        self.seen_batch_ids.insert(batch_id.to_string(), now);
        true
    }

    fn prune_idempotency_keys(&self, now: DateTime<Utc>) {
        let ttl = chrono::Duration::from_std(self.config.idempotency_key_ttl).unwrap_or_default();
        self.seen_batch_ids
            .retain(|_, seen_at| now.signed_duration_since(*seen_at) < ttl);
    }

    /// The backoff delay before attempt `attempt` (zero-based) of a
    /// failed batch write.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let millis = self.config.timeout.as_millis() as f64
            * self.config.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis(millis as u64).min(self.config.max_backoff)
    }

    /// Whether a batch write should be retried given the attempt count
    /// already made.
    #[must_use]
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.config.max_attempts
    }

    /// Turns a raw write outcome into the pipeline's batch-processing
    /// error when any item failed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::BatchProcessing`] if `outcome.failed > 0`.
    pub fn outcome_to_result(outcome: &BatchOutcome) -> Result<()> {
        if outcome.failed == 0 {
            Ok(())
        } else {
            Err(PipelineError::BatchProcessing {
                processed: outcome.processed,
                failed: outcome.failed,
                reasons: outcome.reasons.clone(),
            })
        }
    }
}

impl FragmentType {
    const fn label(self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Relationship => "relationship",
            Self::Embedding => "embedding",
        }
    }
}

/// Orders fragments so that no fragment precedes one it depends on,
/// using Kahn's algorithm. Fragments participating in a cycle are
/// appended afterward in arbitrary (input) order; the caller is
/// responsible for surfacing [`PipelineError::DependencyCycle`] as a
/// diagnostic, since a cycle is processed, not rejected.
fn topological_order(fragments: Vec<Fragment>) -> Vec<Fragment> {
    let by_id: HashMap<String, Fragment> =
        fragments.iter().map(|f| (f.id.clone(), f.clone())).collect();
    let ids_present: HashSet<&str> = by_id.keys().map(String::as_str).collect();

    let mut in_degree: HashMap<String, usize> = HashMap::new();
    let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
    for f in &fragments {
        in_degree.entry(f.id.clone()).or_insert(0);
        for dep in &f.dependencies {
            if ids_present.contains(dep.as_str()) {
                *in_degree.entry(f.id.clone()).or_insert(0) += 1;
                dependents.entry(dep.clone()).or_default().push(f.id.clone());
            }
        }
    }

    let mut queue: VecDeque<String> = in_degree
        .iter()
        .filter(|&(_, °)| deg == 0)
        .map(|(id, _)| id.clone())
        .collect();

    let mut ordered = Vec::with_capacity(fragments.len());
    let mut visited = HashSet::new();
    while let Some(id) = queue.pop_front() {
        if !visited.insert(id.clone()) {
            continue;
        }
        if let Some(fragment) = by_id.get(&id) {
            ordered.push(fragment.clone());
        }
        if let Some(children) = dependents.get(&id) {
            for child in children {
                if let Some(deg) = in_degree.get_mut(child) {
                    *deg = deg.saturating_sub(1);
                    if *deg == 0 {
                        queue.push_back(child.clone());
                    }
                }
            }
        }
    }

    if ordered.len() < fragments.len() {
        for f in fragments {
            if !visited.contains(&f.id) {
                ordered.push(f);
            }
        }
    }
    ordered
}

/// Detects whether a fragment set's dependency graph contains a cycle,
/// for diagnostic reporting alongside [`topological_order`]. Returns the
/// IDs of fragments that never reached in-degree zero during Kahn's
/// algorithm, i.e. the fragments participating in (or downstream of) a
/// cycle.
#[must_use]
pub fn detect_cycle(fragments: &[Fragment]) -> Option<Vec<String>> {
    let ids_present: HashSet<&str> = fragments.iter().map(|f| f.id.as_str()).collect();

    let mut in_degree: HashMap<String, usize> = HashMap::new();
    let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
    for f in fragments {
        in_degree.entry(f.id.clone()).or_insert(0);
        for dep in &f.dependencies {
            if ids_present.contains(dep.as_str()) {
                *in_degree.entry(f.id.clone()).or_insert(0) += 1;
                dependents.entry(dep.clone()).or_default().push(f.id.clone());
            }
        }
    }

    let mut queue: VecDeque<String> = in_degree
        .iter()
        .filter(|&(_, °)| deg == 0)
        .map(|(id, _)| id.clone())
        .collect();

    let mut visited = HashSet::new();
    while let Some(id) = queue.pop_front() {
        if !visited.insert(id.clone()) {
            continue;
        }
        if let Some(children) = dependents.get(&id) {
            for child in children {
                if let Some(deg) = in_degree.get_mut(child) {
                    *deg = deg.saturating_sub(1);
                    if *deg == 0 {
                        queue.push_back(child.clone());
                    }
                }
            }
        }
    }

    let unresolved: Vec<String> = fragments
        .iter()
        .map(|f| f.id.clone())
        .filter(|id| !visited.contains(id))
        .collect();
    if unresolved.is_empty() {
        None
    } else {
        Some(unresolved)
    }
}
