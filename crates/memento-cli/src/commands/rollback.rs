//! Rollback subcommand handlers.
//!
//! Each handler seeds its own short-lived knowledge-graph scenario
//! before performing the requested operation: this binary keeps no
//! state between invocations, so `list`/`diff`/`exec`/`cancel` build a
//! small history within the single run rather than reading one back
//! from a prior command.

use std::io::Write;

use chrono::Utc;
use memento_core::{render_path, Entity, EntityId};
use memento_rollback::{
    ConflictStrategy, OperationStatus, OperationType, RollbackOperation, RollbackOptions,
    RollbackPoint, StrategyKind,
};
use memento_snapshot::RollbackPointId;
use serde::Serialize;

use crate::app::App;
use crate::cli::{ConflictArg, StrategyArg};
use crate::error::{CliError, Result};
use crate::output::TableDisplay;

fn strategy_kind(arg: StrategyArg) -> StrategyKind {
    match arg {
        StrategyArg::Immediate => StrategyKind::Immediate,
        StrategyArg::Gradual => StrategyKind::Gradual,
        StrategyArg::Safe => StrategyKind::Safe,
        StrategyArg::Force => StrategyKind::Force,
    }
}

fn conflict_strategy(arg: ConflictArg) -> ConflictStrategy {
    match arg {
        ConflictArg::Abort => ConflictStrategy::Abort,
        ConflictArg::Skip => ConflictStrategy::Skip,
        ConflictArg::Overwrite => ConflictStrategy::Overwrite,
        ConflictArg::Merge => ConflictStrategy::Merge,
    }
}

/// A JSON/table-friendly view of a [`RollbackPoint`].
#[derive(Debug, Clone, Serialize)]
pub struct RollbackPointView {
    id: String,
    pub(crate) name: String,
    description: Option<String>,
    timestamp: chrono::DateTime<Utc>,
    session_id: Option<String>,
}

impl From<&RollbackPoint> for RollbackPointView {
    fn from(point: &RollbackPoint) -> Self {
        Self {
            id: point.id.to_string(),
            name: point.name.clone(),
            description: point.description.clone(),
            timestamp: point.timestamp,
            session_id: point.session_id.clone(),
        }
    }
}

impl TableDisplay for RollbackPointView {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "id:          {}", self.id)?;
        writeln!(writer, "name:        {}", self.name)?;
        if let Some(description) = &self.description {
            writeln!(writer, "description: {description}")?;
        }
        writeln!(writer, "timestamp:   {}", self.timestamp)?;
        if let Some(session_id) = &self.session_id {
            writeln!(writer, "session:     {session_id}")?;
        }
        Ok(())
    }
}

/// A JSON/table-friendly view of a single diff entry.
#[derive(Debug, Clone, Serialize)]
pub struct DiffEntryView {
    path: String,
    op: String,
    old_value: Option<serde_json::Value>,
    new_value: Option<serde_json::Value>,
}

impl TableDisplay for DiffEntryView {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "{:<8} {}", self.op, self.path)?;
        Ok(())
    }
}

/// A JSON/table-friendly view of a [`RollbackOperation`].
#[derive(Debug, Clone, Serialize)]
pub struct OperationView {
    id: String,
    status: String,
    strategy: String,
    progress: u8,
    target_rollback_point_id: String,
    log: Vec<String>,
}

impl From<&RollbackOperation> for OperationView {
    fn from(operation: &RollbackOperation) -> Self {
        Self {
            id: operation.id.to_string(),
            status: operation.status.to_string(),
            strategy: operation.strategy.to_string(),
            progress: operation.progress,
            target_rollback_point_id: operation.target_rollback_point_id.to_string(),
            log: operation
                .log
                .iter()
                .map(|entry| format!("[{:?}] {}", entry.level, entry.message))
                .collect(),
        }
    }
}

impl TableDisplay for OperationView {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "id:       {}", self.id)?;
        writeln!(writer, "point:    {}", self.target_rollback_point_id)?;
        writeln!(writer, "status:   {}", self.status)?;
        writeln!(writer, "strategy: {}", self.strategy)?;
        writeln!(writer, "progress: {}%", self.progress)?;
        for line in &self.log {
            writeln!(writer, "  {line}")?;
        }
        Ok(())
    }
}

async fn seed_baseline(app: &App, now: chrono::DateTime<Utc>) -> Result<()> {
    let entity = Entity::new(EntityId::new("demo-symbol"), "function", "hash-v1", now);
    app.graph
        .create_entity(entity)
        .await
        .map_err(|source| CliError::InvalidArgument(source.to_string()))
}

async fn mutate_after_baseline(app: &App, now: chrono::DateTime<Utc>) -> Result<()> {
    let entity = Entity::new(EntityId::new("demo-symbol-2"), "function", "hash-v1", now);
    app.graph
        .create_entity(entity)
        .await
        .map_err(|source| CliError::InvalidArgument(source.to_string()))
}

/// Creates a rollback point over a freshly seeded demo graph.
///
/// # Errors
///
/// Returns [`CliError::Rollback`] if point creation fails.
pub async fn create(
    app: &App,
    name: String,
    description: Option<String>,
    now: chrono::DateTime<Utc>,
) -> Result<RollbackPointView> {
    seed_baseline(app, now).await?;
    let id = RollbackPointId::new(name.clone());
    let mut point = app.rollback.create_point(id, name, now).await?;
    if let Some(description) = description {
        point = point.with_description(description);
    }
    Ok(RollbackPointView::from(&point))
}

/// Builds a short demo history of rollback points and lists them.
///
/// # Errors
///
/// Returns [`CliError::Rollback`] if a point fails to create.
pub async fn list(app: &App, now: chrono::DateTime<Utc>) -> Result<Vec<RollbackPointView>> {
    seed_baseline(app, now).await?;
    app.rollback
        .create_point(RollbackPointId::new("after-parse"), "after-parse", now)
        .await?;
    mutate_after_baseline(app, now).await?;
    app.rollback
        .create_point(RollbackPointId::new("after-entities"), "after-entities", now)
        .await?;

    let mut points: Vec<RollbackPointView> = Vec::new();
    for id in app.rollback.store().live_point_ids() {
        let point = app.rollback.store().get_point(&id, now)?;
        points.push(RollbackPointView::from(&point));
    }
    points.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
    Ok(points)
}

/// Seeds a baseline, mutates the graph, and generates the diff against
/// the named point.
///
/// # Errors
///
/// Returns [`CliError::Rollback`] if the point cannot be created or
/// diffed.
pub async fn diff(
    app: &App,
    point_id: String,
    now: chrono::DateTime<Utc>,
) -> Result<Vec<DiffEntryView>> {
    seed_baseline(app, now).await?;
    let id = RollbackPointId::new(point_id);
    app.rollback.create_point(id.clone(), id.to_string(), now).await?;
    mutate_after_baseline(app, now).await?;

    let entries = app.rollback.generate_diff(&id, now).await?;
    Ok(entries
        .iter()
        .map(|entry| DiffEntryView {
            path: render_path(&entry.path),
            op: format!("{:?}", entry.op),
            old_value: entry
                .old_value
                .as_ref()
                .map(|v| serde_json::to_value(v).unwrap_or(serde_json::Value::Null)),
            new_value: entry
                .new_value
                .as_ref()
                .map(|v| serde_json::to_value(v).unwrap_or(serde_json::Value::Null)),
        })
        .collect())
}

/// Seeds a baseline, mutates the graph, and executes a rollback to the
/// named point.
///
/// # Errors
///
/// Returns [`CliError::Rollback`] if the strategy rejects the context or
/// conflicts abort the operation.
pub async fn exec(
    app: &App,
    point_id: String,
    strategy: Option<StrategyArg>,
    conflict: ConflictArg,
    now: chrono::DateTime<Utc>,
) -> Result<OperationView> {
    seed_baseline(app, now).await?;
    let id = RollbackPointId::new(point_id);
    app.rollback.create_point(id.clone(), id.to_string(), now).await?;
    mutate_after_baseline(app, now).await?;

    let options = RollbackOptions {
        op_type: OperationType::Full,
        strategy_override: strategy.map(strategy_kind),
        conflict_strategy: conflict_strategy(conflict),
        resolver: None,
    };
    let operation = app.rollback.rollback(&id, options, now).await?;
    Ok(OperationView::from(&operation))
}

/// Creates a demo in-progress operation labeled `operation_id` and
/// cancels it.
///
/// `operation_id` only labels the created demo operation in its log:
/// this binary has no way to recover an operation created by an earlier
/// invocation, since nothing persists between runs.
///
/// # Errors
///
/// Returns [`CliError::Rollback`] if the operation cannot be cancelled.
pub fn cancel(app: &App, operation_id: &str, now: chrono::DateTime<Utc>) -> Result<OperationView> {
    let mut operation = RollbackOperation::new(
        OperationType::Full,
        RollbackPointId::new("demo"),
        StrategyKind::Gradual,
        now,
    );
    operation.log(
        now,
        memento_rollback::LogLevel::Info,
        format!("started as \"{operation_id}\""),
    );
    operation.status = OperationStatus::InProgress;
    let id = operation.id.clone();
    app.rollback.store().put_operation(operation);

    let cancelled = app.rollback.cancel(&id, now)?;
    Ok(OperationView::from(&cancelled))
}

/// Creates a rollback point and immediately deletes it, demonstrating
/// that deletion is idempotent.
pub async fn delete(app: &App, point_id: String, now: chrono::DateTime<Utc>) -> Result<()> {
    seed_baseline(app, now).await?;
    let id = RollbackPointId::new(point_id);
    app.rollback.create_point(id.clone(), id.to_string(), now).await?;
    app.rollback.delete(&id);
    Ok(())
}
