//! Database readiness collaborator contract.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

/// Contract for the database readiness gate consulted before creating a
/// rollback point when `require_database_ready` is set.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    /// Whether the database is ready to serve reads/writes.
    async fn is_ready(&self) -> bool;
}

/// A toggle-able in-memory [`DatabaseService`], defaulting to ready.
#[derive(Debug)]
pub struct InMemoryDatabase {
    ready: AtomicBool,
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self {
            ready: AtomicBool::new(true),
        }
    }
}

impl InMemoryDatabase {
    /// Creates a database double in the given readiness state.
    #[must_use]
    pub fn new(ready: bool) -> Self {
        Self {
            ready: AtomicBool::new(ready),
        }
    }

    /// Flips the readiness state.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn defaults_to_ready() {
        let db = InMemoryDatabase::default();
        assert!(db.is_ready().await);
    }

    #[tokio::test]
    async fn set_ready_flips_state() {
        let db = InMemoryDatabase::new(true);
        db.set_ready(false);
        assert!(!db.is_ready().await);
    }
}
