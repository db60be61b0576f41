//! Optional file-system snapshot source collaborator contract.

use async_trait::async_trait;
use memento_core::CanonicalValue;
use parking_lot::RwLock;

use crate::error::Result;

/// Contract for an optional collaborator that contributes a `file_system`
/// snapshot when a rollback point is created.
#[async_trait]
pub trait FileSystemService: Send + Sync {
    /// Captures the current file-system state relevant to rollback, in
    /// canonical form.
    async fn capture(&self) -> Result<CanonicalValue>;
}

/// An in-memory [`FileSystemService`] returning a caller-supplied value,
/// standing in for a real file-system walk in tests and local exercise.
pub struct InMemoryFileSystem {
    state: RwLock<CanonicalValue>,
}

impl InMemoryFileSystem {
    /// Creates a file-system double that always captures `state`.
    #[must_use]
    pub fn new(state: CanonicalValue) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Replaces the captured state.
    pub fn set_state(&self, state: CanonicalValue) {
        *self.state.write() = state;
    }
}

#[async_trait]
impl FileSystemService for InMemoryFileSystem {
    async fn capture(&self) -> Result<CanonicalValue> {
        Ok(self.state.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn capture_returns_current_state() {
        let fs = InMemoryFileSystem::new(CanonicalValue::Null);
        assert_eq!(fs.capture().await.unwrap(), CanonicalValue::Null);
        fs.set_state(CanonicalValue::Bool(true));
        assert_eq!(fs.capture().await.unwrap(), CanonicalValue::Bool(true));
    }
}
