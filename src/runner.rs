//! Test Runner
//!
//! Replays a suite against the rule table in group then insertion order,
//! judging each case and collecting which rules were reached.
//!
//! A run moves `Idle -> Loading -> Running -> Summarizing -> Done`, or ends
//! in `Errored` when the table cannot be loaded or there is nothing to run.
//! An errored run produces no results.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::cases::{TestCase, TestSuite};
use crate::compare::{self, Status};
use crate::coverage::{self, CoverageSummary, FailureRow};
use crate::error::{RewriteTestError, RunResult};
use crate::host::RewriteHost;
use crate::matcher::query::parse_query;
use crate::matcher::{
    normalize_path, query_part, BasicMatcher, ExtendedMatcher, MatchOutcome, QueryVars,
};
use crate::policy::RunPolicy;
use crate::rules::RuleTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Loading,
    Running,
    Summarizing,
    Done,
    Errored,
}

/// One judged case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub case: TestCase,
    pub outcome: MatchOutcome,
    pub status: Status,
}

/// Everything a complete run produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub results: Vec<TestResult>,
    pub summary: CoverageSummary,
    /// Rule sources of the table the run used, `all` first
    pub sources: Vec<String>,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| r.status == Status::Fail)
    }
}

pub struct TestRunner<'a> {
    host: &'a dyn RewriteHost,
    policy: &'a dyn RunPolicy,
    phase: RunPhase,
}

impl<'a> TestRunner<'a> {
    pub fn new(host: &'a dyn RewriteHost, policy: &'a dyn RunPolicy) -> Self {
        Self {
            host,
            policy,
            phase: RunPhase::Idle,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Load the rule table and replay every case of `suite`
    pub fn run(&mut self, suite: &TestSuite) -> RunResult<RunReport> {
        self.enter(RunPhase::Loading);
        let table = match RuleTable::load(self.host, self.policy) {
            Ok(table) => table,
            Err(e) => return Err(self.fail(e)),
        };

        self.enter(RunPhase::Running);
        if suite.is_empty() {
            return Err(self.fail(RewriteTestError::EmptyTestSuite));
        }
        let (results, touched, error_count) = self.replay(&table, suite.cases());

        self.enter(RunPhase::Summarizing);
        let failures = results
            .iter()
            .filter(|r| r.status == Status::Fail)
            .map(failure_row)
            .collect();
        let summary = coverage::summarize(&table, &touched, error_count, failures);

        self.enter(RunPhase::Done);
        info!(
            "Ran {} tests: {} failed, {}/{} rules tested ({}%)",
            results.len(),
            error_count,
            summary.tested,
            summary.total,
            summary.coverage_pct
        );

        Ok(RunReport {
            results,
            summary,
            sources: table.sources().to_vec(),
        })
    }

    fn replay<'c>(
        &self,
        table: &RuleTable,
        cases: impl Iterator<Item = &'c TestCase>,
    ) -> (Vec<TestResult>, HashSet<String>, usize) {
        let home = self.host.home_path();
        let basic = BasicMatcher::new(table);
        let extended = ExtendedMatcher::new(table, self.host, self.policy);

        let mut results = Vec::new();
        let mut touched = HashSet::new();
        let mut error_count = 0;

        for case in cases {
            let path = normalize_path(&case.path, home.as_deref());
            let mut outcome = MatchOutcome::default();

            if let Some(rule) = basic.find(&path) {
                touched.insert(rule.pattern.clone());
                outcome.matched_rule = Some(rule.pattern.clone());
                outcome.basic_result = Some(rule.rewrite.clone());
            }

            if case.expectation.query.is_some() {
                let extra = query_part(&case.path)
                    .map(parse_query)
                    .unwrap_or_default();
                let resolved = extended.resolve(&path, &extra);
                outcome.query_rule = resolved.rule;
                outcome.structured_result = Some(resolved.query_vars);
            }

            let status = compare::judge(case, &outcome, self.policy);
            if status == Status::Fail {
                error_count += 1;
            }
            debug!("{} {} -> {}", status, case.path, path);

            results.push(TestResult {
                case: case.clone(),
                outcome,
                status,
            });
        }

        (results, touched, error_count)
    }

    fn enter(&mut self, phase: RunPhase) {
        debug!("Run phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn fail(&mut self, error: RewriteTestError) -> RewriteTestError {
        self.enter(RunPhase::Errored);
        error
    }
}

/// Render query vars as a query string, keys sorted
pub fn format_query(vars: &QueryVars) -> String {
    vars.iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn failure_row(result: &TestResult) -> FailureRow {
    let expectation = &result.case.expectation;
    let outcome = &result.outcome;

    let (expected, actual) = if !compare::rewrite_matches(expectation, outcome) {
        (
            expectation.rewrite.clone().unwrap_or_default(),
            outcome.basic_result.clone().unwrap_or_default(),
        )
    } else {
        (
            expectation.query.as_ref().map(format_query).unwrap_or_default(),
            outcome
                .structured_result
                .as_ref()
                .map(format_query)
                .unwrap_or_default(),
        )
    };

    FailureRow {
        group: result.case.group.clone(),
        path: result.case.path.clone(),
        expected,
        actual,
    }
}
