//! Session-manager collaborator contract.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::{CollabError, Result};

/// Contract for the session manager collaborator.
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// The currently active session ID, if any.
    async fn get_current_session_id(&self) -> Option<String>;

    /// Arbitrary session-scoped data, keyed by session ID.
    async fn get_session_data(&self, id: &str) -> Result<serde_json::Value>;
}

/// An in-memory [`SessionManager`] backed by a plain map.
#[derive(Default)]
pub struct InMemorySessionManager {
    current: RwLock<Option<String>>,
    data: RwLock<HashMap<String, serde_json::Value>>,
}

impl InMemorySessionManager {
    /// Creates an empty session manager with no active session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current session ID.
    pub fn set_current_session(&self, id: impl Into<String>) {
        *self.current.write() = Some(id.into());
    }

    /// Records data for a session.
    pub fn set_session_data(&self, id: impl Into<String>, data: serde_json::Value) {
        self.data.write().insert(id.into(), data);
    }
}

#[async_trait]
impl SessionManager for InMemorySessionManager {
    async fn get_current_session_id(&self) -> Option<String> {
        self.current.read().clone()
    }

    async fn get_session_data(&self, id: &str) -> Result<serde_json::Value> {
        self.data
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| CollabError::SessionNotFound { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn current_session_defaults_to_none() {
        let manager = InMemorySessionManager::new();
        assert_eq!(manager.get_current_session_id().await, None);
    }

    #[tokio::test]
    async fn session_data_round_trips() {
        let manager = InMemorySessionManager::new();
        manager.set_session_data("s1", json!({"k": "v"}));
        let data = manager.get_session_data("s1").await.unwrap();
        assert_eq!(data, json!({"k": "v"}));
    }

    #[tokio::test]
    async fn missing_session_data_errors() {
        let manager = InMemorySessionManager::new();
        assert!(matches!(
            manager.get_session_data("missing").await,
            Err(CollabError::SessionNotFound { .. })
        ));
    }
}
