//! Test execution history, flakiness scoring, and performance trend
//! detection.
//!
//! Performance trends are classified by comparing rolling windows against
//! configured deltas; per-test execution history is kept as a bounded
//! historical point series.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use memento_collab::{BulkWriteOptions, KnowledgeGraphService, RelationshipQuery};
use memento_core::{Entity, EntityId, Relationship, RelationshipId, RelationshipType, TestingRelationKind};
use parking_lot::Mutex;

use crate::error::{Result, TemporalError};

/// How a single test execution concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    /// The test ran and its assertions held.
    Passed,
    /// The test ran and at least one assertion failed.
    Failed,
    /// The test was not executed.
    Skipped,
    /// The test could not run (e.g. setup threw).
    Error,
}

impl TestStatus {
    /// Whether this status counts as a failure for flakiness scoring.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }
}

/// A single reported test outcome, as submitted to [`TemporalTracker::record_test_results`].
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Stable identifier for the test (used as its entity ID).
    pub test_id: String,
    /// Human-readable test name.
    pub test_name: String,
    /// How long the test took to run.
    pub duration_ms: f64,
    /// How the test concluded.
    pub status: TestStatus,
    /// The code entity this test exercises, if known. Seeds `TESTS` and
    /// `BROKE_IN`/`FIXED_IN` relationships.
    pub target_symbol: Option<String>,
}

impl TestResult {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.test_id.trim().is_empty() {
            return Err("testId must not be empty".to_string());
        }
        if self.test_name.trim().is_empty() {
            return Err("testName must not be empty".to_string());
        }
        if self.duration_ms < 0.0 {
            return Err("duration must be >= 0".to_string());
        }
        Ok(())
    }
}

/// A batch of test results reported together.
#[derive(Debug, Clone)]
pub struct TestSuiteReport {
    /// Identifies this run, used to dedup executions recorded from it.
    pub run_id: String,
    /// The individual results.
    pub results: Vec<TestResult>,
}

/// One recorded execution in a test's bounded history.
#[derive(Debug, Clone)]
pub struct TestExecution {
    /// Deduplication key: `{run_id}:{test_id}`.
    pub id: String,
    /// How the test concluded.
    pub status: TestStatus,
    /// How long it took.
    pub duration_ms: f64,
    /// When this execution was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Maximum executions retained per test before the oldest is evicted.
pub const MAX_HISTORY_PER_TEST: usize = 200;
/// Window size for "recent" failure rate and trend comparisons.
pub const RECENT_WINDOW: usize = 5;

struct TestHistory {
    test_name: String,
    executions: VecDeque<TestExecution>,
    last_status: Option<TestStatus>,
    sequence: i64,
    regression_open: bool,
}

impl TestHistory {
    fn new(test_name: String) -> Self {
        Self {
            test_name,
            executions: VecDeque::new(),
            last_status: None,
            sequence: 0,
            regression_open: false,
        }
    }

    fn contains_execution(&self, id: &str) -> bool {
        self.executions.iter().any(|e| e.id == id)
    }

    fn push(&mut self, execution: TestExecution) {
        self.executions.push_back(execution);
        if self.executions.len() > MAX_HISTORY_PER_TEST {
            self.executions.pop_front();
        }
    }

    fn failure_rate(&self) -> f64 {
        rate(self.executions.iter().map(|e| e.status))
    }

    fn recent_failure_rate(&self) -> (f64, usize) {
        let recent: Vec<TestStatus> = self
            .executions
            .iter()
            .rev()
            .take(RECENT_WINDOW)
            .map(|e| e.status)
            .collect();
        let failures = recent.iter().filter(|s| s.is_failure()).count();
        (rate(recent.into_iter()), failures)
    }
}

fn rate(statuses: impl Iterator<Item = TestStatus>) -> f64 {
    let mut total = 0usize;
    let mut failures = 0usize;
    for status in statuses {
        if matches!(status, TestStatus::Skipped) {
            continue;
        }
        total += 1;
        if status.is_failure() {
            failures += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        failures as f64 / total as f64
    }
}

/// Flakiness assessment for one test.
#[derive(Debug, Clone)]
pub struct FlakinessReport {
    /// The test this report is about.
    pub test_id: String,
    /// `0.6 * overallFailureRate + 0.4 * recentFailureRate`.
    pub flaky_score: f64,
    /// Failure rate across all retained history.
    pub failure_rate: f64,
    /// Failure rate over the last [`RECENT_WINDOW`] executions.
    pub recent_failure_rate: f64,
    /// Number of failures within the last [`RECENT_WINDOW`] executions.
    pub recent_failures: usize,
    /// Whether this test is "flaky enough" to surface.
    pub reportable: bool,
    /// Threshold- and pattern-based remediation suggestions.
    pub recommendations: Vec<String>,
}

fn recommendations_for(flaky_score: f64, executions: &VecDeque<TestExecution>) -> Vec<String> {
    let mut recs = Vec::new();
    if flaky_score > 0.8 {
        recs.push("critical: this test is unreliable enough to block merges until fixed".to_string());
    } else if flaky_score > 0.7 {
        recs.push("high: prioritize stabilizing this test soon".to_string());
    } else if flaky_score > 0.5 {
        recs.push("medium: schedule time to investigate this test's instability".to_string());
    }

    if alternates(executions) {
        recs.push(
            "the pass/fail pattern alternates run-to-run, suggesting race conditions or timing dependencies"
                .to_string(),
        );
    }
    recs
}

/// Detects a strict pass/fail/pass/fail alternation over the last
/// [`RECENT_WINDOW`] executions (ignoring skips), a signature of
/// timing-sensitive flakiness.
fn alternates(executions: &VecDeque<TestExecution>) -> bool {
    let recent: Vec<TestStatus> = executions
        .iter()
        .rev()
        .filter(|e| !matches!(e.status, TestStatus::Skipped))
        .take(RECENT_WINDOW)
        .map(|e| e.status)
        .collect();
    if recent.len() < 4 {
        return false;
    }
    recent.windows(2).all(|pair| pair[0].is_failure() != pair[1].is_failure())
}

/// Env-driven thresholds governing performance-trend classification
///.
#[derive(Debug, Clone, Copy)]
pub struct PerfThresholds {
    /// p95 duration above which `PERFORMANCE_IMPACT` is raised regardless
    /// of trend.
    pub p95_impact_ms: f64,
    /// Average duration above which `PERFORMANCE_IMPACT` is raised
    /// regardless of trend.
    pub avg_impact_ms: f64,
    /// Minimum absolute delta (ms) for a trend to be classified as
    /// degrading/improving.
    pub degrading_min_delta_ms: f64,
    /// Consecutive runs of sustained, monotone increase required before
    /// `PERFORMANCE_REGRESSION` fires.
    pub trend_min_runs: usize,
    /// Minimum executions required before trend detection runs at all.
    pub min_history: usize,
}

impl Default for PerfThresholds {
    fn default() -> Self {
        Self {
            p95_impact_ms: 2_000.0,
            avg_impact_ms: 1_000.0,
            degrading_min_delta_ms: 50.0,
            trend_min_runs: 5,
            min_history: 10,
        }
    }
}

impl PerfThresholds {
    /// Loads thresholds from the environment, falling back to defaults
    /// for any variable that is unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            p95_impact_ms: env_f64("PERF_IMPACT_P95_MS").unwrap_or(defaults.p95_impact_ms),
            avg_impact_ms: env_f64("PERF_IMPACT_AVG_MS").unwrap_or(defaults.avg_impact_ms),
            degrading_min_delta_ms: env_f64("PERF_DEGRADING_MIN_DELTA_MS")
                .unwrap_or(defaults.degrading_min_delta_ms),
            trend_min_runs: env_usize("PERF_TREND_MIN_RUNS").unwrap_or(defaults.trend_min_runs),
            min_history: env_usize("PERF_MIN_HISTORY").unwrap_or(defaults.min_history),
        }
    }
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Direction of a performance trend relative to the prior window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    /// Durations are rising run over run.
    Degrading,
    /// Durations are falling run over run.
    Improving,
    /// No material change.
    Stable,
}

/// Latency statistics and trend for one test.
#[derive(Debug, Clone)]
pub struct PerformanceStats {
    /// Average duration over successful runs (or all runs, if none
    /// passed).
    pub average_ms: f64,
    /// 95th percentile duration, same population as `average_ms`.
    pub p95_ms: f64,
    /// The trend direction over the last two windows of size
    /// `trend_min_runs`.
    pub trend: Trend,
}

/// Emitted side effects of [`TemporalTracker::record_test_results`]
///.
#[derive(Debug, Clone)]
pub enum TemporalEvent {
    /// A test transitioned from passing/skipped/unknown to failing.
    BrokeIn {
        /// The test's entity ID.
        test_id: String,
        /// The code entity the test targets, if known.
        target_symbol: Option<String>,
        /// The test-scoped session this transition was recorded under.
        session_id: String,
        /// Monotonic sequence number within that session.
        sequence_number: i64,
    },
    /// A previously failing test started passing again.
    FixedIn {
        /// The test's entity ID.
        test_id: String,
        /// The code entity the test targets, if known.
        target_symbol: Option<String>,
        /// The test-scoped session this transition was recorded under.
        session_id: String,
        /// Monotonic sequence number within that session.
        sequence_number: i64,
    },
    /// Sustained, monotone latency growth was detected.
    PerformanceRegression {
        /// The affected test.
        test_id: String,
        /// The trend driving this event (`Degrading` when raised,
        /// `Improving` when a prior regression is closed).
        trend: Trend,
        /// When a prior regression was closed by this event, the
        /// resolution time.
        resolved_at: Option<DateTime<Utc>>,
    },
    /// Absolute latency crossed a configured impact threshold.
    PerformanceImpact {
        /// The affected test.
        test_id: String,
        /// The p95 duration observed.
        p95_ms: f64,
        /// The average duration observed.
        average_ms: f64,
    },
}

/// Tracks per-test execution history, flakiness, and performance trend,
/// and mirrors transitions into the knowledge graph as `BROKE_IN`/
/// `FIXED_IN` relationships.
pub struct TemporalTracker {
    graph: std::sync::Arc<dyn KnowledgeGraphService>,
    histories: Mutex<HashMap<String, TestHistory>>,
    thresholds: PerfThresholds,
}

impl TemporalTracker {
    /// Builds a tracker over the given knowledge-graph collaborator.
    #[must_use]
    pub fn new(graph: std::sync::Arc<dyn KnowledgeGraphService>, thresholds: PerfThresholds) -> Self {
        Self {
            graph,
            histories: Mutex::new(HashMap::new()),
            thresholds,
        }
    }

    /// Records a suite of test results: validates each, updates or
    /// creates each test's entity and bounded execution history, and
    /// returns every `BROKE_IN`/`FIXED_IN`/performance event raised.
    ///
    /// # Errors
    ///
    /// Returns [`TemporalError::InvalidTestResult`] if any result fails
    /// basic shape validation, or [`TemporalError::Collaborator`] if a
    /// graph write fails.
    pub async fn record_test_results(
        &self,
        suite: &TestSuiteReport,
        now: DateTime<Utc>,
    ) -> Result<Vec<TemporalEvent>> {
        for result in &suite.results {
            result.validate().map_err(|reason| TemporalError::InvalidTestResult {
                test_id: result.test_id.clone(),
                reason,
            })?;
        }

        let mut events = Vec::new();
        for result in &suite.results {
            events.extend(self.record_one(suite, result, now).await?);
        }
        Ok(events)
    }

    async fn record_one(
        &self,
        suite: &TestSuiteReport,
        result: &TestResult,
        now: DateTime<Utc>,
    ) -> Result<Vec<TemporalEvent>> {
        let execution_id = format!("{}:{}", suite.run_id, result.test_id);

        let mut events = Vec::new();
        let (_prev_status, transition, sequence, session_id) = {
            let mut histories = self.histories.lock();
            let history = histories
                .entry(result.test_id.clone())
                .or_insert_with(|| TestHistory::new(result.test_name.clone()));

            if history.contains_execution(&execution_id) {
                return Ok(Vec::new());
            }

            let prev_status = history.last_status;
            history.push(TestExecution {
                id: execution_id,
                status: result.status,
                duration_ms: result.duration_ms,
                timestamp: now,
            });
            history.last_status = Some(result.status);

            let broke = !matches!(prev_status, Some(TestStatus::Failed)) && result.status.is_failure();
            let fixed = matches!(prev_status, Some(TestStatus::Failed)) && result.status == TestStatus::Passed;
            if broke || fixed {
                history.sequence += 1;
            }
            let session_id = format!("test-session:{}", result.test_id);
            (prev_status, (broke, fixed), history.sequence, session_id)
        };

        self.graph
            .create_or_update_entity(Entity::new(
                EntityId::new(result.test_id.clone()),
                "test",
                format!("{:?}:{}", result.status, result.duration_ms),
                now,
            ))
            .await
            .map_err(|e| TemporalError::Collaborator { reason: e.to_string() })?;

        let (broke, fixed) = transition;
        if broke {
            events.push(
                self.emit_transition(
                    TestingRelationKind::BrokeIn,
                    result,
                    &session_id,
                    sequence,
                    now,
                )
                .await?,
            );
        } else if fixed {
            events.push(
                self.emit_transition(
                    TestingRelationKind::FixedIn,
                    result,
                    &session_id,
                    sequence,
                    now,
                )
                .await?,
            );
        }

        events.extend(self.performance_events(&result.test_id, now));
        Ok(events)
    }

    async fn emit_transition(
        &self,
        kind: TestingRelationKind,
        result: &TestResult,
        session_id: &str,
        sequence_number: i64,
        now: DateTime<Utc>,
    ) -> Result<TemporalEvent> {
        let target = result
            .target_symbol
            .clone()
            .unwrap_or_else(|| result.test_id.clone());
        let relationship = Relationship {
            id: RelationshipId::from_raw(format!("{session_id}:{sequence_number}")),
            from_entity_id: EntityId::new(result.test_id.clone()),
            to_entity_id: EntityId::new(target.clone()),
            to_ref: None,
            relation_type: RelationshipType::Testing(kind),
            created: now,
            last_modified: now,
            version: 1,
            metadata: HashMap::new(),
            session_id: Some(session_id.to_string()),
            sequence_number: Some(sequence_number),
            metric_id: None,
            environment: None,
            scenario: None,
            qualifiers: Vec::new(),
        };
        self.graph
            .create_relationship(relationship)
            .await
            .map_err(|e| TemporalError::Collaborator { reason: e.to_string() })?;

        Ok(match kind {
            TestingRelationKind::BrokeIn => TemporalEvent::BrokeIn {
                test_id: result.test_id.clone(),
                target_symbol: result.target_symbol.clone(),
                session_id: session_id.to_string(),
                sequence_number,
            },
            _ => TemporalEvent::FixedIn {
                test_id: result.test_id.clone(),
                target_symbol: result.target_symbol.clone(),
                session_id: session_id.to_string(),
                sequence_number,
            },
        })
    }

    /// Computes the current flakiness report for a test, if it has any
    /// recorded history.
    #[must_use]
    pub fn flakiness(&self, test_id: &str) -> Option<FlakinessReport> {
        let histories = self.histories.lock();
        let history = histories.get(test_id)?;
        let failure_rate = history.failure_rate();
        let (recent_failure_rate, recent_failures) = history.recent_failure_rate();
        let flaky_score = 0.6 * failure_rate + 0.4 * recent_failure_rate;
        let reportable = flaky_score >= 0.2 || failure_rate >= 0.2 || recent_failures > 0;
        Some(FlakinessReport {
            test_id: test_id.to_string(),
            flaky_score,
            failure_rate,
            recent_failure_rate,
            recent_failures,
            reportable,
            recommendations: recommendations_for(flaky_score, &history.executions),
        })
    }

    /// Computes the current performance statistics and trend for a test.
    #[must_use]
    pub fn performance(&self, test_id: &str) -> Option<PerformanceStats> {
        let histories = self.histories.lock();
        let history = histories.get(test_id)?;
        Some(self.performance_stats(history))
    }

    fn performance_stats(&self, history: &TestHistory) -> PerformanceStats {
        let passed: Vec<f64> = history
            .executions
            .iter()
            .filter(|e| e.status == TestStatus::Passed)
            .map(|e| e.duration_ms)
            .collect();
        let population: Vec<f64> = if passed.is_empty() {
            history.executions.iter().map(|e| e.duration_ms).collect()
        } else {
            passed
        };

        let average_ms = mean(&population);
        let p95_ms = percentile(&population, 0.95);
        let trend = self.trend_for(history);

        PerformanceStats {
            average_ms,
            p95_ms,
            trend,
        }
    }

    fn trend_for(&self, history: &TestHistory) -> Trend {
        let window = self.thresholds.trend_min_runs.max(1);
        if history.executions.len() < 2 * window {
            return Trend::Stable;
        }
        let durations: Vec<f64> = history.executions.iter().map(|e| e.duration_ms).collect();
        let len = durations.len();
        let last_window = &durations[len - window..];
        let prev_window = &durations[len - 2 * window..len - window];
        let last_avg = mean(last_window);
        let prev_avg = mean(prev_window);
        let delta = last_avg - prev_avg;
        let relative = if prev_avg.abs() > f64::EPSILON {
            delta.abs() / prev_avg
        } else {
            0.0
        };
        let min_delta = self.thresholds.degrading_min_delta_ms;

        if delta >= min_delta || relative >= 0.05 {
            if delta > 0.0 {
                Trend::Degrading
            } else {
                Trend::Improving
            }
        } else {
            Trend::Stable
        }
    }

    fn performance_events(&self, test_id: &str, now: DateTime<Utc>) -> Vec<TemporalEvent> {
        let mut histories = self.histories.lock();
        let Some(history) = histories.get_mut(test_id) else {
            return Vec::new();
        };
        if history.executions.len() < self.thresholds.min_history {
            return Vec::new();
        }
        let stats = self.performance_stats(history);
        let mut events = Vec::new();

        let sustained = self.sustained_regression(history);
        if sustained && !history.regression_open {
            history.regression_open = true;
            events.push(TemporalEvent::PerformanceRegression {
                test_id: test_id.to_string(),
                trend: Trend::Degrading,
                resolved_at: None,
            });
        } else if stats.trend == Trend::Improving && history.regression_open {
            history.regression_open = false;
            events.push(TemporalEvent::PerformanceRegression {
                test_id: test_id.to_string(),
                trend: Trend::Improving,
                resolved_at: Some(now),
            });
        }

        if stats.p95_ms > self.thresholds.p95_impact_ms || stats.average_ms > self.thresholds.avg_impact_ms {
            events.push(TemporalEvent::PerformanceImpact {
                test_id: test_id.to_string(),
                p95_ms: stats.p95_ms,
                average_ms: stats.average_ms,
            });
        }
        events
    }

    /// Whether the last `trend_min_runs` durations increased
    /// monotonically with a total delta at or above
    /// `degrading_min_delta_ms`.
    fn sustained_regression(&self, history: &TestHistory) -> bool {
        let window = self.thresholds.trend_min_runs.max(2);
        if history.executions.len() < window {
            return false;
        }
        let durations: Vec<f64> = history
            .executions
            .iter()
            .rev()
            .take(window)
            .map(|e| e.duration_ms)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        let monotone = durations.windows(2).all(|pair| pair[1] >= pair[0]);
        let total_delta = durations.last().copied().unwrap_or(0.0) - durations.first().copied().unwrap_or(0.0);
        monotone && total_delta >= self.thresholds.degrading_min_delta_ms
    }

    /// Every entity ID an incident checkpoint should seed from a suite's
    /// failing tests: the failing tests themselves, plus the `TESTS`
    /// targets they're linked to, plus any explicit `target_symbol`.
    ///
    /// # Errors
    ///
    /// Returns [`TemporalError::Collaborator`] if the graph query fails.
    pub async fn incident_seed_entities(&self, suite: &TestSuiteReport) -> Result<Vec<EntityId>> {
        let mut seeds = Vec::new();
        for result in suite.results.iter().filter(|r| r.status.is_failure()) {
            seeds.push(EntityId::new(result.test_id.clone()));
            if let Some(symbol) = &result.target_symbol {
                seeds.push(EntityId::new(symbol.clone()));
            }
            let query = RelationshipQuery {
                from_entity_id: Some(EntityId::new(result.test_id.clone())),
                type_name: Some(TestingRelationKind::Tests.name().to_string()),
                ..RelationshipQuery::default()
            };
            let rels = self
                .graph
                .get_relationships(&query)
                .await
                .map_err(|e| TemporalError::Collaborator { reason: e.to_string() })?;
            seeds.extend(rels.into_iter().map(|r| r.to_entity_id));
        }
        seeds.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        seeds.dedup();
        Ok(seeds)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = (p * (sorted.len() as f64 - 1.0)).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use memento_collab::InMemoryKnowledgeGraph;
    use std::sync::Arc;

    fn tracker() -> TemporalTracker {
        TemporalTracker::new(Arc::new(InMemoryKnowledgeGraph::new()), PerfThresholds::default())
    }

    fn result(test_id: &str, status: TestStatus) -> TestResult {
        TestResult {
            test_id: test_id.to_string(),
            test_name: format!("{test_id}-name"),
            duration_ms: 10.0,
            status,
            target_symbol: Some("sym".to_string()),
        }
    }

    #[tokio::test]
    async fn pass_to_fail_transition_emits_broke_in() {
        let tracker = tracker();
        let now = Utc::now();
        tracker
            .record_test_results(
                &TestSuiteReport {
                    run_id: "r1".to_string(),
                    results: vec![result("t1", TestStatus::Passed)],
                },
                now,
            )
            .await
            .unwrap();
        let events = tracker
            .record_test_results(
                &TestSuiteReport {
                    run_id: "r2".to_string(),
                    results: vec![result("t1", TestStatus::Failed)],
                },
                now,
            )
            .await
            .unwrap();
        assert!(matches!(events[0], TemporalEvent::BrokeIn { .. }));
    }

    #[tokio::test]
    async fn fail_to_pass_transition_emits_fixed_in() {
        let tracker = tracker();
        let now = Utc::now();
        tracker
            .record_test_results(
                &TestSuiteReport {
                    run_id: "r1".to_string(),
                    results: vec![result("t1", TestStatus::Failed)],
                },
                now,
            )
            .await
            .unwrap();
        let events = tracker
            .record_test_results(
                &TestSuiteReport {
                    run_id: "r2".to_string(),
                    results: vec![result("t1", TestStatus::Passed)],
                },
                now,
            )
            .await
            .unwrap();
        assert!(matches!(events[0], TemporalEvent::FixedIn { .. }));
    }

    #[tokio::test]
    async fn duplicate_execution_id_is_not_double_counted() {
        let tracker = tracker();
        let now = Utc::now();
        let suite = TestSuiteReport {
            run_id: "r1".to_string(),
            results: vec![result("t1", TestStatus::Passed)],
        };
        tracker.record_test_results(&suite, now).await.unwrap();
        tracker.record_test_results(&suite, now).await.unwrap();
        let report = tracker.flakiness("t1").unwrap();
        assert_eq!(report.failure_rate, 0.0);
    }

    #[tokio::test]
    async fn invalid_duration_is_rejected() {
        let tracker = tracker();
        let mut bad = result("t1", TestStatus::Passed);
        bad.duration_ms = -1.0;
        let err = tracker
            .record_test_results(
                &TestSuiteReport {
                    run_id: "r1".to_string(),
                    results: vec![bad],
                },
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TemporalError::InvalidTestResult { .. }));
    }

    #[tokio::test]
    async fn alternating_pass_fail_is_reported_flaky() {
        let tracker = tracker();
        let now = Utc::now();
        for i in 0..20 {
            let status = if i % 2 == 0 { TestStatus::Passed } else { TestStatus::Failed };
            tracker
                .record_test_results(
                    &TestSuiteReport {
                        run_id: format!("r{i}"),
                        results: vec![result("t1", status)],
                    },
                    now,
                )
                .await
                .unwrap();
        }
        let report = tracker.flakiness("t1").unwrap();
        assert!(report.flaky_score >= 0.4, "flaky_score={}", report.flaky_score);
        assert!(report.reportable);
    }
}
