//! Coverage Accounting
//!
//! Partitions the rule table into rules some test path reached first
//! (tested) and rules nothing reached (missed).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::rules::RuleTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuiteStatus {
    Passing,
    Failing,
}

impl fmt::Display for SuiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuiteStatus::Passing => write!(f, "Passing"),
            SuiteStatus::Failing => write!(f, "Failing"),
        }
    }
}

/// A failing case as shown in summaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRow {
    pub group: String,
    pub path: String,
    pub expected: String,
    pub actual: String,
}

/// Outcome of the last complete run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub status: SuiteStatus,
    pub error_count: usize,
    /// Patterns some case matched first, in table order
    pub tested_rules: Vec<String>,
    /// Patterns no case matched first, in table order
    pub missed_rules: Vec<String>,
    pub tested: usize,
    pub missed: usize,
    pub total: usize,
    pub coverage_pct: u32,
    #[serde(default)]
    pub failures: Vec<FailureRow>,
}

impl CoverageSummary {
    pub fn is_passing(&self) -> bool {
        self.status == SuiteStatus::Passing
    }
}

/// Build the summary of a run
pub fn summarize(
    table: &RuleTable,
    touched: &HashSet<String>,
    error_count: usize,
    failures: Vec<FailureRow>,
) -> CoverageSummary {
    let (tested_rules, missed_rules): (Vec<String>, Vec<String>) = table
        .rules()
        .map(|rule| rule.pattern.clone())
        .partition(|pattern| touched.contains(pattern));

    let tested = tested_rules.len();
    let missed = missed_rules.len();
    let total = tested + missed;

    CoverageSummary {
        status: if error_count > 0 {
            SuiteStatus::Failing
        } else {
            SuiteStatus::Passing
        },
        error_count,
        tested_rules,
        missed_rules,
        tested,
        missed,
        total,
        coverage_pct: coverage_pct(tested, total),
        failures,
    }
}

/// `floor(100 * tested / total)`, 0 for an empty table
pub fn coverage_pct(tested: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (tested * 100 / total) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageStatus {
    Tested,
    Missed,
}

impl fmt::Display for CoverageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageStatus::Tested => write!(f, "tested"),
            CoverageStatus::Missed => write!(f, "missed"),
        }
    }
}

impl FromStr for CoverageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tested" => Ok(CoverageStatus::Tested),
            "missed" => Ok(CoverageStatus::Missed),
            other => Err(format!("unknown coverage status '{}'", other)),
        }
    }
}

/// One rule of the coverage detail listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageRow {
    pub status: CoverageStatus,
    #[serde(rename = "match")]
    pub pattern: String,
    #[serde(rename = "query")]
    pub rewrite: String,
    pub source: String,
}

/// Per-rule coverage in table order, limited to `statuses` (all when empty)
pub fn coverage_rows(
    table: &RuleTable,
    summary: &CoverageSummary,
    statuses: &[CoverageStatus],
) -> Vec<CoverageRow> {
    let tested: HashSet<&str> = summary.tested_rules.iter().map(String::as_str).collect();

    table
        .rules()
        .map(|rule| CoverageRow {
            status: if tested.contains(rule.pattern.as_str()) {
                CoverageStatus::Tested
            } else {
                CoverageStatus::Missed
            },
            pattern: rule.pattern.clone(),
            rewrite: rule.rewrite.clone(),
            source: rule.source.clone(),
        })
        .filter(|row| statuses.is_empty() || statuses.contains(&row.status))
        .collect()
}
