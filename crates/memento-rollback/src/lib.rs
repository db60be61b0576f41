//! Rollback-point store, diff-driven restore strategies, and conflict
//! resolution for Memento.
//!
//! # Modules
//!
//! - [`types`]: rollback points, operations, and their lifecycle.
//! - [`lru`]: the bounded map backing [`store::RollbackStore`].
//! - [`conflict`]: conflict taxonomy and resolution policies.
//! - [`strategy`]: the `Immediate`/`Gradual`/`Safe`/`Force` restore
//!   strategies.
//! - [`store`]: the rollback point/operation store and its lifecycle
//!   events.
//! - [`manager`]: orchestrates collaborators, the store, and strategies
//!   into point creation, diffing, and restore.
//! - [`error`]: the crate's error taxonomy.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod conflict;
pub mod error;
pub mod lru;
pub mod manager;
pub mod store;
pub mod strategy;
pub mod types;

pub use conflict::{ConflictKind, ConflictResolver, ConflictStrategy, Resolution, RollbackConflict};
pub use error::{Result, RollbackError};
pub use lru::LruMap;
pub use manager::{RollbackConfig, RollbackManager, RollbackOptions};
pub use store::{RollbackStore, StoreConfig, StoreEvent};
pub use strategy::{
    DiffTarget, ForceStrategy, GradualStrategy, ImmediateStrategy, RollbackStrategy, SafeStrategy,
    StrategyContext,
};
pub use types::{
    LogEntry, LogLevel, OperationId, OperationStatus, OperationType, RollbackOperation,
    RollbackPoint, StrategyKind,
};
pub use memento_snapshot::RollbackPointId;
