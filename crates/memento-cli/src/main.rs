//! `memento` binary entrypoint.
//!
//! A local exercise CLI driving the Memento rollback, pipeline, and
//! temporal managers over in-memory collaborators — no gateway, no
//! persistent graph database.

mod app;
mod cli;
mod commands;
mod error;
mod output;

use chrono::Utc;
use clap::Parser;
use tracing::info;

use app::App;
use cli::{Cli, Commands, PipelineCommands, RollbackCommands, TemporalCommands};
use error::CliError;
use memento_config::MementoConfig;
use output::OutputFormat;

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("memento=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("memento=info,warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    init_tracing(cli.verbose);
    info!("memento starting");

    let config = MementoConfig::load_or_default(cli.config.as_deref())?.with_env_overrides();
    let app = App::new(config);
    let out = OutputFormat::new(cli.format);
    let now = Utc::now();
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    match cli.command {
        Commands::Rollback { command } => match command {
            RollbackCommands::Create { name, description } => {
                let point = commands::rollback::create(&app, name, description, now).await?;
                out.write(&mut handle, &point)?;
            }
            RollbackCommands::List => {
                let points = commands::rollback::list(&app, now).await?;
                out.write(&mut handle, &points)?;
            }
            RollbackCommands::Diff { point_id } => {
                let entries = commands::rollback::diff(&app, point_id, now).await?;
                out.write(&mut handle, &entries)?;
            }
            RollbackCommands::Exec {
                point_id,
                strategy,
                conflict,
            } => {
                let operation =
                    commands::rollback::exec(&app, point_id, strategy, conflict, now).await?;
                out.write(&mut handle, &operation)?;
            }
            RollbackCommands::Cancel { operation_id } => {
                let operation = commands::rollback::cancel(&app, &operation_id, now)?;
                out.write(&mut handle, &operation)?;
            }
            RollbackCommands::Delete { point_id } => {
                commands::rollback::delete(&app, point_id, now).await?;
                out.write(&mut handle, &())?;
            }
        },
        Commands::Pipeline { command } => match command {
            PipelineCommands::Demo { events } => {
                let report = commands::pipeline::demo(&app, events).await?;
                out.write(&mut handle, &report)?;
            }
        },
        Commands::Temporal { command } => match command {
            TemporalCommands::Record { path } => {
                let events = commands::temporal::record(&app, &path).await?;
                out.write(&mut handle, &events)?;
            }
            TemporalCommands::Flaky { path, test_id } => {
                let report = commands::temporal::flaky(&app, &path, &test_id).await?;
                out.write(&mut handle, &report)?;
            }
        },
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    if let Err(err) = runtime.block_on(run(cli)) {
        eprintln!("memento error: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use memento_config::MementoConfig;

    use super::*;

    fn parse_args(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("memento").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_rollback_list() {
        let cli = parse_args(&["rollback", "list"]);
        assert!(matches!(
            cli.command,
            Commands::Rollback {
                command: RollbackCommands::List
            }
        ));
    }

    #[test]
    fn test_parse_pipeline_demo_with_event_count() {
        let cli = parse_args(&["pipeline", "demo", "--events", "5"]);
        match cli.command {
            Commands::Pipeline {
                command: PipelineCommands::Demo { events },
            } => assert_eq!(events, 5),
            other => panic!("expected pipeline demo, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rollback_create_then_list_round_trips() {
        let app = App::new(MementoConfig::default());
        let now = Utc::now();
        let point = commands::rollback::create(&app, "cp1".to_string(), None, now)
            .await
            .expect("create rollback point");
        assert_eq!(point.name, "cp1");

        let points = commands::rollback::list(&app, now).await.expect("list points");
        assert!(!points.is_empty());
    }

    #[tokio::test]
    async fn pipeline_demo_reports_drained_events() {
        let app = App::new(MementoConfig::default());
        let report = commands::pipeline::demo(&app, 8).await.expect("run demo");
        assert_eq!(report.enqueued, 8);
        assert!(report.drained <= report.enqueued);
    }

    #[tokio::test]
    async fn temporal_record_then_flaky_reports_history() {
        let app = App::new(MementoConfig::default());
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        write!(
            file,
            r#"{{
                "run_id": "run-1",
                "results": [
                    {{"test_id": "t1", "test_name": "it works", "duration_ms": 12.0, "status": "passed"}},
                    {{"test_id": "t1", "test_name": "it works", "duration_ms": 14.0, "status": "failed", "target_symbol": "foo::bar"}}
                ]
            }}"#
        )
        .expect("write suite json");

        let _events = commands::temporal::record(&app, file.path())
            .await
            .expect("record suite");

        let report = commands::temporal::flaky(&app, file.path(), "t1")
            .await
            .expect("flakiness report");
        assert_eq!(report.test_id, "t1");
    }
}
