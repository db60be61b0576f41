//! Temporal test-relationship subcommand handlers.
//!
//! Reads a suite of test results from a JSON file, in a shape this
//! binary defines for itself (`memento_temporal::TestSuiteReport` does
//! not derive `serde` traits, since the library crate has no file-I/O
//! concerns), and replays them through the tracker.

use std::io::Write;
use std::path::Path;

use chrono::Utc;
use memento_temporal::{FlakinessReport, TemporalEvent, TestResult, TestStatus, TestSuiteReport};
use serde::{Deserialize, Serialize};

use crate::app::App;
use crate::error::{CliError, Result};
use crate::output::TableDisplay;

/// File-shape counterpart to [`TestResult`].
#[derive(Debug, Clone, Deserialize)]
pub struct TestResultInput {
    /// See [`TestResult::test_id`].
    pub test_id: String,
    /// See [`TestResult::test_name`].
    pub test_name: String,
    /// See [`TestResult::duration_ms`].
    pub duration_ms: f64,
    /// See [`TestResult::status`].
    pub status: TestStatus,
    /// See [`TestResult::target_symbol`].
    #[serde(default)]
    pub target_symbol: Option<String>,
}

impl From<TestResultInput> for TestResult {
    fn from(input: TestResultInput) -> Self {
        Self {
            test_id: input.test_id,
            test_name: input.test_name,
            duration_ms: input.duration_ms,
            status: input.status,
            target_symbol: input.target_symbol,
        }
    }
}

/// File-shape counterpart to [`TestSuiteReport`].
#[derive(Debug, Clone, Deserialize)]
pub struct TestSuiteReportInput {
    /// See [`TestSuiteReport::run_id`].
    pub run_id: String,
    /// See [`TestSuiteReport::results`].
    pub results: Vec<TestResultInput>,
}

impl From<TestSuiteReportInput> for TestSuiteReport {
    fn from(input: TestSuiteReportInput) -> Self {
        Self {
            run_id: input.run_id,
            results: input.results.into_iter().map(TestResult::from).collect(),
        }
    }
}

fn load_suite(path: &Path) -> Result<TestSuiteReport> {
    let content = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let input: TestSuiteReportInput =
        serde_json::from_str(&content).map_err(|source| CliError::Json {
            path: path.display().to_string(),
            source,
        })?;
    Ok(TestSuiteReport::from(input))
}

/// A JSON/table-friendly view of a [`TemporalEvent`].
#[derive(Debug, Clone, Serialize)]
pub struct TemporalEventView {
    kind: &'static str,
    test_id: String,
    detail: String,
}

impl From<&TemporalEvent> for TemporalEventView {
    fn from(event: &TemporalEvent) -> Self {
        match event {
            TemporalEvent::BrokeIn {
                test_id,
                target_symbol,
                session_id,
                sequence_number,
            } => Self {
                kind: "broke_in",
                test_id: test_id.clone(),
                detail: format!(
                    "target={} session={session_id} seq={sequence_number}",
                    target_symbol.as_deref().unwrap_or("<unknown>")
                ),
            },
            TemporalEvent::FixedIn {
                test_id,
                target_symbol,
                session_id,
                sequence_number,
            } => Self {
                kind: "fixed_in",
                test_id: test_id.clone(),
                detail: format!(
                    "target={} session={session_id} seq={sequence_number}",
                    target_symbol.as_deref().unwrap_or("<unknown>")
                ),
            },
            TemporalEvent::PerformanceRegression { test_id, trend, resolved_at } => Self {
                kind: "performance_regression",
                test_id: test_id.clone(),
                detail: match resolved_at {
                    Some(at) => format!("trend={trend:?} resolved_at={at}"),
                    None => format!("trend={trend:?}"),
                },
            },
            TemporalEvent::PerformanceImpact { test_id, p95_ms, average_ms } => Self {
                kind: "performance_impact",
                test_id: test_id.clone(),
                detail: format!("p95_ms={p95_ms:.1} avg_ms={average_ms:.1}"),
            },
        }
    }
}

impl TableDisplay for TemporalEventView {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "{:<24} {:<20} {}", self.kind, self.test_id, self.detail)?;
        Ok(())
    }
}

/// Replays a test-suite report file and returns the events it raised.
///
/// # Errors
///
/// Returns [`CliError::Io`]/[`CliError::Json`] if the file cannot be read
/// or parsed, or [`CliError::Temporal`] if the tracker rejects a result.
pub async fn record(app: &App, path: &Path) -> Result<Vec<TemporalEventView>> {
    let suite = load_suite(path)?;
    let events = app.tracker.record_test_results(&suite, Utc::now()).await?;
    Ok(events.iter().map(TemporalEventView::from).collect())
}

/// A JSON/table-friendly view of a [`FlakinessReport`].
#[derive(Debug, Clone, Serialize)]
pub struct FlakinessReportView {
    pub(crate) test_id: String,
    flaky_score: f64,
    failure_rate: f64,
    recent_failure_rate: f64,
    recent_failures: usize,
    reportable: bool,
    recommendations: Vec<String>,
}

impl From<FlakinessReport> for FlakinessReportView {
    fn from(report: FlakinessReport) -> Self {
        Self {
            test_id: report.test_id,
            flaky_score: report.flaky_score,
            failure_rate: report.failure_rate,
            recent_failure_rate: report.recent_failure_rate,
            recent_failures: report.recent_failures,
            reportable: report.reportable,
            recommendations: report.recommendations,
        }
    }
}

impl TableDisplay for FlakinessReportView {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "test:          {}", self.test_id)?;
        writeln!(writer, "flaky score:   {:.3}", self.flaky_score)?;
        writeln!(writer, "failure rate:  {:.3}", self.failure_rate)?;
        writeln!(writer, "recent rate:   {:.3}", self.recent_failure_rate)?;
        writeln!(writer, "recent fails:  {}", self.recent_failures)?;
        writeln!(writer, "reportable:    {}", self.reportable)?;
        for recommendation in &self.recommendations {
            writeln!(writer, "  - {recommendation}")?;
        }
        Ok(())
    }
}

/// Replays a test-suite report file, then reports the flakiness
/// assessment for one of its tests.
///
/// # Errors
///
/// Returns the same file errors as [`record`], or
/// [`CliError::InvalidArgument`] if `test_id` has no recorded history.
pub async fn flaky(app: &App, path: &Path, test_id: &str) -> Result<FlakinessReportView> {
    let suite = load_suite(path)?;
    app.tracker.record_test_results(&suite, Utc::now()).await?;
    app.tracker
        .flakiness(test_id)
        .map(FlakinessReportView::from)
        .ok_or_else(|| CliError::InvalidArgument(format!("no history recorded for test {test_id}")))
}
