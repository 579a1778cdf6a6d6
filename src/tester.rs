//! Rewrite Tester
//!
//! Entry point an embedding application holds on to: owns the site, the
//! suite, the policy and the summary store, and serializes runs.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{CacheError, SummaryStore};
use crate::cases::{TestCase, TestSuite};
use crate::coverage::{self, CoverageRow, CoverageStatus, CoverageSummary};
use crate::error::RunResult;
use crate::host::RewriteHost;
use crate::policy::{DefaultPolicy, RunPolicy};
use crate::rules::RuleTable;
use crate::runner::{RunReport, TestRunner};

pub struct RewriteTester {
    host: Arc<dyn RewriteHost>,
    store: Arc<dyn SummaryStore>,
    policy: Arc<dyn RunPolicy>,
    suite: TestSuite,
    /// Held for the length of a run
    run_guard: Mutex<()>,
}

impl RewriteTester {
    pub fn new(host: Arc<dyn RewriteHost>, store: Arc<dyn SummaryStore>, suite: TestSuite) -> Self {
        Self {
            host,
            store,
            policy: Arc::new(DefaultPolicy),
            suite,
            run_guard: Mutex::new(()),
        }
    }

    /// Replace the default policy
    pub fn with_policy(mut self, policy: Arc<dyn RunPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn suite(&self) -> &TestSuite {
        &self.suite
    }

    /// Cases of the named groups, everything when `groups` is empty
    pub fn list_test_cases(&self, groups: Option<&[String]>) -> RunResult<Vec<TestCase>> {
        self.suite.filter(groups)
    }

    /// Load and reconcile the site's rule table
    pub fn rules(&self) -> RunResult<RuleTable> {
        RuleTable::load(self.host.as_ref(), self.policy.as_ref())
    }

    /// Replay the whole suite and store its summary
    pub fn run_tests(&self) -> RunResult<RunReport> {
        let _guard = self.run_guard.lock();

        let report =
            TestRunner::new(self.host.as_ref(), self.policy.as_ref()).run(&self.suite)?;

        if let Err(e) = self.store.write(&report.summary) {
            warn!("Failed to cache test summary: {}", e);
        }

        Ok(report)
    }

    /// Summary of the last run, running the suite when none is stored
    pub fn summary(&self) -> RunResult<CoverageSummary> {
        match self.store.read() {
            Some(summary) => Ok(summary),
            None => self.refresh_summary(),
        }
    }

    /// Run the suite and return its fresh summary
    pub fn refresh_summary(&self) -> RunResult<CoverageSummary> {
        self.run_tests().map(|report| report.summary)
    }

    /// Per-rule coverage of the current table, limited to `statuses`
    pub fn coverage_detail(&self, statuses: &[CoverageStatus]) -> RunResult<Vec<CoverageRow>> {
        let table = self.rules()?;
        let summary = self.summary()?;
        Ok(coverage::coverage_rows(&table, &summary, statuses))
    }

    /// Forget the stored summary, as after the rule table changed
    pub fn flush(&self) -> Result<(), CacheError> {
        info!("Flushing stored test summary");
        self.store.invalidate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SummaryCache;
    use crate::cases::defaults::default_suite;
    use crate::cases::Expectation;
    use crate::compare::Status;
    use crate::config::CacheConfig;
    use crate::coverage::SuiteStatus;
    use crate::error::RewriteTestError;
    use crate::host::SiteSnapshot;
    use crate::matcher::QueryVars;

    const FIXTURE: &str = include_str!("../fixtures/site.toml");
    const CASES: &str = include_str!("../fixtures/cases.toml");

    fn tester(suite: TestSuite) -> RewriteTester {
        let site = SiteSnapshot::from_str(FIXTURE).unwrap();
        let store = SummaryCache::new(&CacheConfig::default());
        RewriteTester::new(Arc::new(site), Arc::new(store), suite)
    }

    fn vars(pairs: &[(&str, &str)]) -> QueryVars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_corpus_passes_on_fixture_site() {
        let report = tester(default_suite()).run_tests().unwrap();

        let failing: Vec<&str> = report
            .failures()
            .map(|r| r.case.path.as_str())
            .collect();
        assert!(failing.is_empty(), "failing paths: {:?}", failing);
        assert_eq!(report.summary.status, SuiteStatus::Passing);
        assert_eq!(report.results.len(), 89);
        assert!(report.summary.tested > 0);
        assert!(report.summary.missed > 0);
        assert_eq!(report.sources[0], "all");
    }

    #[test]
    fn test_fixture_cases_pass() {
        let mut suite = default_suite();
        suite.merge(TestSuite::from_str(CASES).unwrap());
        let report = tester(suite).run_tests().unwrap();

        let failing: Vec<&str> = report
            .failures()
            .map(|r| r.case.path.as_str())
            .collect();
        assert!(failing.is_empty(), "failing paths: {:?}", failing);
    }

    #[test]
    fn test_reference_paths() {
        let mut suite = TestSuite::new();
        suite.insert(
            "Categories",
            "/category/news/feed/atom/",
            Expectation::rewrite("index.php?category_name=$matches[1]&feed=$matches[2]"),
        );
        suite.insert(
            "Pages",
            "query-test/",
            Expectation::query(vars(&[("page", ""), ("pagename", "query-test")])),
        );
        suite.insert(
            "Dates",
            "/2014/10/5/hello/2",
            Expectation::query(vars(&[
                ("day", "5"),
                ("monthnum", "10"),
                ("name", "hello"),
                ("page", "2"),
                ("year", "2014"),
            ])),
        );

        let report = tester(suite).run_tests().unwrap();
        assert_eq!(report.results[0].status, Status::Pass);
        assert_eq!(report.results[1].status, Status::Pass);
        assert_eq!(report.results[2].status, Status::Pass);
        assert_eq!(
            report.results[2].outcome.query_rule,
            report.results[2].outcome.matched_rule
        );
    }

    #[test]
    fn test_summary_is_cached_until_flushed() {
        let site = SiteSnapshot::from_str(FIXTURE).unwrap();
        let store = Arc::new(SummaryCache::new(&CacheConfig::default()));
        let tester = RewriteTester::new(Arc::new(site), store.clone(), default_suite());

        // A stored summary is served without replaying the suite
        let stored = CoverageSummary {
            status: SuiteStatus::Failing,
            error_count: 7,
            tested_rules: vec![],
            missed_rules: vec![],
            tested: 0,
            missed: 0,
            total: 0,
            coverage_pct: 0,
            failures: vec![],
        };
        store.write(&stored).unwrap();
        assert_eq!(tester.summary().unwrap(), stored);
        assert_eq!(tester.summary().unwrap(), stored);

        tester.flush().unwrap();
        assert_eq!(store.read(), None);

        let fresh = tester.summary().unwrap();
        assert_ne!(fresh, stored);
        assert_eq!(fresh.status, SuiteStatus::Passing);
        assert_eq!(fresh.error_count, 0);
        assert!(fresh.total > 0);
        assert_eq!(store.read(), Some(fresh));
    }

    #[test]
    fn test_coverage_detail_partitions_table() {
        let tester = tester(default_suite());
        let table = tester.rules().unwrap();
        let summary = tester.summary().unwrap();

        let tested = tester.coverage_detail(&[CoverageStatus::Tested]).unwrap();
        let missed = tester.coverage_detail(&[CoverageStatus::Missed]).unwrap();
        assert_eq!(tested.len(), summary.tested);
        assert_eq!(missed.len(), summary.missed);
        assert_eq!(tested.len() + missed.len(), table.len());
    }

    #[test]
    fn test_list_filters_by_group() {
        let tester = tester(default_suite());
        assert_eq!(tester.list_test_cases(None).unwrap().len(), 89);

        let tags = tester
            .list_test_cases(Some(&["Tags".to_string()]))
            .unwrap();
        assert_eq!(tags.len(), 4);

        assert!(matches!(
            tester.list_test_cases(Some(&["Nope".to_string()])),
            Err(RewriteTestError::NoMatchingGroup { .. })
        ));
    }

    #[test]
    fn test_stale_site_yields_no_summary() {
        let stale = format!(
            "{}\n{}",
            FIXTURE,
            r#"
            [[rules]]
            pattern = 'shop/([^/]+)/?$'
            rewrite = 'index.php?product=$matches[1]'
            source = "product"
            persisted = false
            "#
        );
        let site = SiteSnapshot::from_str(&stale).unwrap();
        let store = Arc::new(SummaryCache::new(&CacheConfig::default()));
        let tester = RewriteTester::new(Arc::new(site), store.clone(), default_suite());

        assert!(matches!(
            tester.summary(),
            Err(RewriteTestError::StaleRuleTable { .. })
        ));
        assert!(store.read().is_none());
    }
}
