//! Core types: rollback points, operations, and their lifecycle.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use memento_snapshot::RollbackPointId;

/// Unique identifier for a rollback operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(Uuid);

impl OperationId {
    /// Creates a new random operation ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named marker in time to which the graph can be restored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackPoint {
    /// Unique identifier.
    pub id: RollbackPointId,
    /// Human-readable name.
    pub name: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// When this point was created.
    pub timestamp: DateTime<Utc>,
    /// Free-form metadata.
    pub metadata: HashMap<String, serde_json::Value>,
    /// The session this point was created in, if any.
    pub session_id: Option<String>,
    /// When this point should be considered expired.
    pub expires_at: Option<DateTime<Utc>>,
}

impl RollbackPoint {
    /// Creates a new rollback point.
    #[must_use]
    pub fn new(id: RollbackPointId, name: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            timestamp,
            metadata: HashMap::new(),
            session_id: None,
            expires_at: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the owning session.
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Sets the expiry time.
    #[must_use]
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether this point is expired as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry < now)
    }

    /// The point's age relative to `now`.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.timestamp
    }
}

/// The scope of a rollback operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    /// Restores every captured snapshot.
    Full,
    /// Restores a caller-selected subset.
    Partial,
}

/// A rollback operation's lifecycle status. Transitions are monotonic:
/// `Pending → InProgress → {Completed, Failed, Cancelled}`; once terminal,
/// an operation is read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    /// Queued but not yet started.
    Pending,
    /// Currently executing.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Cancelled before completion.
    Cancelled,
}

impl OperationStatus {
    /// Whether this status is terminal (no further transitions allowed).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{label}")
    }
}

/// One line of a rollback operation's structured log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// When this line was logged.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: LogLevel,
    /// The message text.
    pub message: String,
}

impl LogEntry {
    /// Creates a new log entry at `timestamp`.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            level,
            message: message.into(),
        }
    }
}

/// Severity of a [`LogEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// Informational.
    Info,
    /// Noteworthy but non-fatal.
    Warn,
    /// An error condition.
    Error,
}

/// Which strategy executed (or will execute) a rollback operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Apply all changes sequentially after one conflict pass.
    Immediate,
    /// Apply changes in fixed-size batches with inter-batch delay.
    Gradual,
    /// Capture a safety backup before applying, with final verification.
    Safe,
    /// Skip validation and conflict detection for maximal throughput.
    Force,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Immediate => "immediate",
            Self::Gradual => "gradual",
            Self::Safe => "safe",
            Self::Force => "force",
        };
        write!(f, "{label}")
    }
}

/// A rollback operation's full record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackOperation {
    /// Unique identifier.
    pub id: OperationId,
    /// Full or partial restore.
    pub op_type: OperationType,
    /// The rollback point being restored to.
    pub target_rollback_point_id: RollbackPointId,
    /// Current lifecycle status.
    pub status: OperationStatus,
    /// Progress, `0..=100`.
    pub progress: u8,
    /// When the operation started.
    pub started_at: DateTime<Utc>,
    /// When the operation reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// The strategy executing this operation.
    pub strategy: StrategyKind,
    /// Structured execution log.
    pub log: Vec<LogEntry>,
}

impl RollbackOperation {
    /// Creates a new, pending operation.
    #[must_use]
    pub fn new(
        op_type: OperationType,
        target_rollback_point_id: RollbackPointId,
        strategy: StrategyKind,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OperationId::new(),
            op_type,
            target_rollback_point_id,
            status: OperationStatus::Pending,
            progress: 0,
            started_at,
            completed_at: None,
            strategy,
            log: Vec::new(),
        }
    }

    /// Appends a log entry.
    pub fn log(&mut self, timestamp: DateTime<Utc>, level: LogLevel, message: impl Into<String>) {
        self.log.push(LogEntry::new(timestamp, level, message));
    }

    /// Updates progress, clamped to `0..=100`.
    pub fn set_progress(&mut self, progress: u8) {
        self.progress = progress.min(100);
    }

    /// Transitions to `InProgress`.
    pub fn start(&mut self) {
        self.status = OperationStatus::InProgress;
    }

    /// Transitions to a terminal status, recording `completed_at`.
    pub fn finish(&mut self, status: OperationStatus, completed_at: DateTime<Utc>) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.progress = match status {
            OperationStatus::Completed => 100,
            _ => self.progress,
        };
        self.completed_at = Some(completed_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_point_is_expired_only_past_expiry() {
        let now = Utc::now();
        let point = RollbackPoint::new(RollbackPointId::new("p1"), "p1", now)
            .with_expires_at(now + chrono::Duration::milliseconds(100));
        assert!(!point.is_expired(now));
        assert!(point.is_expired(now + chrono::Duration::milliseconds(150)));
    }

    #[test]
    fn operation_status_terminal_states() {
        assert!(OperationStatus::Completed.is_terminal());
        assert!(OperationStatus::Failed.is_terminal());
        assert!(OperationStatus::Cancelled.is_terminal());
        assert!(!OperationStatus::Pending.is_terminal());
        assert!(!OperationStatus::InProgress.is_terminal());
    }

    #[test]
    fn set_progress_clamps_at_100() {
        let mut op = RollbackOperation::new(
            OperationType::Full,
            RollbackPointId::new("p1"),
            StrategyKind::Immediate,
            Utc::now(),
        );
        op.set_progress(250);
        assert_eq!(op.progress, 100);
    }

    #[test]
    fn finish_sets_completed_at_and_full_progress_on_success() {
        let mut op = RollbackOperation::new(
            OperationType::Full,
            RollbackPointId::new("p1"),
            StrategyKind::Immediate,
            Utc::now(),
        );
        let now = Utc::now();
        op.finish(OperationStatus::Completed, now);
        assert_eq!(op.progress, 100);
        assert_eq!(op.completed_at, Some(now));
    }
}
