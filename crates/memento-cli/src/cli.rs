//! Command-line argument parsing with clap.
//!
//! A top-level struct with a format flag and a config path, dispatching to
//! one subcommand enum per subsystem.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Local exercise CLI for the Memento rollback, pipeline, and temporal
/// managers.
///
/// This does not talk to the HTTP/MCP gateway or a real graph database;
/// every subcommand runs against a fresh in-memory knowledge graph
/// constructed for the invocation (see `memento_collab::InMemoryKnowledgeGraph`).
#[derive(Parser, Debug, Clone)]
#[command(name = "memento")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a `MementoConfig` JSON file. Defaults to the built-in
    /// defaults, layered with environment-variable overrides for the
    /// temporal thresholds and incident-checkpoint gates.
    #[arg(short, long, env = "MEMENTO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands, one group per CORE subsystem.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Rollback point and operation management.
    Rollback {
        /// Rollback subcommand to execute.
        #[command(subcommand)]
        command: RollbackCommands,
    },

    /// Ingestion pipeline demonstration.
    Pipeline {
        /// Pipeline subcommand to execute.
        #[command(subcommand)]
        command: PipelineCommands,
    },

    /// Temporal test-relationship tracking.
    Temporal {
        /// Temporal subcommand to execute.
        #[command(subcommand)]
        command: TemporalCommands,
    },
}

/// Rollback subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum RollbackCommands {
    /// Create a rollback point, capturing a snapshot of the demo graph.
    Create {
        /// The point's name.
        name: String,
        /// An optional description.
        #[arg(long)]
        description: Option<String>,
    },

    /// List rollback points currently held in the store.
    List,

    /// Show the diff between the current demo graph and a rollback
    /// point's captured state.
    Diff {
        /// The rollback point ID.
        point_id: String,
    },

    /// Execute a rollback to a point.
    Exec {
        /// The rollback point ID.
        point_id: String,
        /// Force a specific strategy instead of the size/age heuristic.
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
        /// How to resolve conflicts detected during apply.
        #[arg(long, value_enum, default_value_t = ConflictArg::Abort)]
        conflict: ConflictArg,
    },

    /// Cancel an in-progress rollback operation.
    Cancel {
        /// The operation ID.
        operation_id: String,
    },

    /// Delete a rollback point and its snapshots.
    Delete {
        /// The rollback point ID.
        point_id: String,
    },
}

/// `--strategy` values for [`RollbackCommands::Exec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Apply every change in one pass.
    Immediate,
    /// Apply in fixed-size batches with an inter-batch delay.
    Gradual,
    /// Capture a safety backup and verify each step.
    Safe,
    /// Skip validation and conflict detection for maximal throughput.
    Force,
}

/// `--conflict` values for [`RollbackCommands::Exec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum ConflictArg {
    /// Fail the whole operation if any conflict is detected.
    #[default]
    Abort,
    /// Skip conflicted diff entries.
    Skip,
    /// Apply the rollback value unconditionally.
    Overwrite,
    /// Apply a heuristic merge.
    Merge,
}

/// Pipeline subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum PipelineCommands {
    /// Enqueue synthetic change events, drain them through a worker into
    /// batches, and report queue/batch metrics.
    Demo {
        /// Number of synthetic change events to enqueue.
        #[arg(long, default_value_t = 20)]
        events: usize,
    },
}

/// Temporal subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum TemporalCommands {
    /// Record a test-suite report (a JSON array of results) and report
    /// the `BROKE_IN`/`FIXED_IN`/performance events it raised.
    Record {
        /// Path to a JSON file containing a `TestSuiteReportInput`.
        path: PathBuf,
    },

    /// Report the flakiness score and recommendations for a test,
    /// recomputed from a replayed suite file the same as `record`.
    Flaky {
        /// Path to the JSON suite file to replay.
        path: PathBuf,
        /// The test ID to report on.
        test_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rollback_create() {
        let cli = Cli::parse_from(["memento", "rollback", "create", "checkpoint-1"]);
        match cli.command {
            Commands::Rollback {
                command: RollbackCommands::Create { name, description },
            } => {
                assert_eq!(name, "checkpoint-1");
                assert!(description.is_none());
            }
            other => panic!("expected rollback create, got {other:?}"),
        }
    }

    #[test]
    fn parses_rollback_exec_with_strategy_and_conflict() {
        let cli = Cli::parse_from([
            "memento",
            "rollback",
            "exec",
            "p1",
            "--strategy",
            "safe",
            "--conflict",
            "merge",
        ]);
        match cli.command {
            Commands::Rollback {
                command:
                    RollbackCommands::Exec {
                        point_id,
                        strategy,
                        conflict,
                    },
            } => {
                assert_eq!(point_id, "p1");
                assert_eq!(strategy, Some(StrategyArg::Safe));
                assert_eq!(conflict, ConflictArg::Merge);
            }
            other => panic!("expected rollback exec, got {other:?}"),
        }
    }

    #[test]
    fn defaults_conflict_to_abort() {
        let cli = Cli::parse_from(["memento", "rollback", "exec", "p1"]);
        match cli.command {
            Commands::Rollback {
                command: RollbackCommands::Exec { conflict, .. },
            } => assert_eq!(conflict, ConflictArg::Abort),
            other => panic!("expected rollback exec, got {other:?}"),
        }
    }

    #[test]
    fn parses_pipeline_demo_with_default_event_count() {
        let cli = Cli::parse_from(["memento", "pipeline", "demo"]);
        match cli.command {
            Commands::Pipeline {
                command: PipelineCommands::Demo { events },
            } => assert_eq!(events, 20),
            other => panic!("expected pipeline demo, got {other:?}"),
        }
    }

    #[test]
    fn respects_format_flag() {
        let cli = Cli::parse_from(["memento", "--format", "json", "rollback", "list"]);
        assert_eq!(cli.format, Format::Json);
    }

    #[test]
    fn format_defaults_to_table() {
        let cli = Cli::parse_from(["memento", "rollback", "list"]);
        assert_eq!(cli.format, Format::Table);
    }
}
