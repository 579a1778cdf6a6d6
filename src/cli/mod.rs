//! CLI Module
//!
//! Command handlers for the `rewrite-testing` binary: listing and running
//! test cases, summaries, coverage and the rule table.

use anyhow::{anyhow, Context, Result};
use clap::Subcommand;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::SummaryCache;
use crate::cases::defaults::default_suite;
use crate::cases::TestSuite;
use crate::compare::Status;
use crate::config::{CacheConfig, CacheStorage, Config};
use crate::coverage::CoverageStatus;
use crate::error::RewriteTestError;
use crate::host::SiteSnapshot;
use crate::rules::ALL_SOURCES;
use crate::runner::format_query;
use crate::tester::RewriteTester;

pub mod format;

pub use format::OutputFormat;
use format::{render_item, render_items, select_fields, Row};

const LIST_FIELDS: &[&str] = &["group", "path", "match", "query"];

const RUN_DEFAULT_FIELDS: &[&str] = &[
    "status",
    "group",
    "path",
    "matched",
    "rewrite_test",
    "rewrite_result",
];
const RUN_FIELDS: &[&str] = &[
    "status",
    "group",
    "path",
    "matched",
    "rewrite_test",
    "rewrite_result",
    "query_test",
    "query_result",
];

const SUMMARY_DEFAULT_FIELDS: &[&str] = &["status", "errors", "tested", "missed", "coverage"];
const SUMMARY_FIELDS: &[&str] = &[
    "status", "passing", "errors", "total", "tested", "missed", "coverage",
];

const COVERAGE_FIELDS: &[&str] = &["status", "match", "query", "source"];
const RULE_FIELDS: &[&str] = &["match", "query", "source"];

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Validate configuration file
    Validate,
    /// Show default configuration
    ShowDefault,
}

/// Command line overrides of the configuration file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub site: Option<PathBuf>,
    pub cases: Option<PathBuf>,
    pub no_default_cases: bool,
}

/// Load the configuration file (defaults when absent) and apply overrides
pub fn load_config(config_path: &Path, overrides: &Overrides) -> Result<Config> {
    let mut config = if config_path.exists() {
        info!("Loading configuration from {:?}", config_path);
        Config::load(config_path)?
    } else {
        debug!("No configuration at {:?}, using defaults", config_path);
        Config::default()
    };

    if let Some(site) = &overrides.site {
        config.site.snapshot = site.to_string_lossy().into_owned();
    }
    if let Some(cases) = &overrides.cases {
        config.tests.cases = Some(cases.to_string_lossy().into_owned());
    }
    if overrides.no_default_cases {
        config.tests.include_defaults = false;
    }

    config.validate()?;
    Ok(config)
}

/// Wire a tester from configuration
pub fn build_tester(config: &Config) -> Result<RewriteTester> {
    let site = SiteSnapshot::load(&config.site.snapshot)
        .with_context(|| format!("Cannot load site snapshot {}", config.site.snapshot))?;

    let mut suite = if config.tests.include_defaults {
        default_suite()
    } else {
        TestSuite::new()
    };
    if let Some(cases) = &config.tests.cases {
        let extra =
            TestSuite::load(cases).with_context(|| format!("Cannot load test cases {}", cases))?;
        suite.merge(extra);
    }
    debug!("Test suite has {} cases", suite.len());

    let store = SummaryCache::new(&config.cache);
    Ok(RewriteTester::new(Arc::new(site), Arc::new(store), suite))
}

/// `list`: show the test cases
pub fn list_tests(
    tester: &RewriteTester,
    groups: &[String],
    fields: &[String],
    format: OutputFormat,
) -> Result<()> {
    let fields = select_fields(fields, LIST_FIELDS, LIST_FIELDS)?;
    let cases = tester.list_test_cases(Some(groups))?;

    let rows: Vec<Row> = cases
        .iter()
        .map(|case| {
            row(json!({
                "group": case.group,
                "path": case.path,
                "match": case.expectation.rewrite,
                "query": case.expectation.query.as_ref().map(format_query),
            }))
        })
        .collect();

    println!("{}", render_items(format, &fields, &rows)?);
    Ok(())
}

/// `run`: replay the suite and show every result
pub fn run_tests(tester: &RewriteTester, fields: &[String], format: OutputFormat) -> Result<()> {
    let fields = select_fields(fields, RUN_DEFAULT_FIELDS, RUN_FIELDS)?;

    let report = match tester.run_tests() {
        Ok(report) => report,
        Err(RewriteTestError::StaleRuleTable { missing }) => {
            let rows: Vec<Row> = missing
                .iter()
                .map(|rule| row(json!({ "match": rule.pattern, "query": rule.rewrite })))
                .collect();
            let fields = vec!["match".to_string(), "query".to_string()];
            println!("{}", render_items(format, &fields, &rows)?);
            return Err(RewriteTestError::StaleRuleTable { missing }.into());
        }
        Err(e) => return Err(e.into()),
    };

    let rows: Vec<Row> = report
        .results
        .iter()
        .map(|result| {
            let expectation = &result.case.expectation;
            let outcome = &result.outcome;
            row(json!({
                "status": status_label(result.status),
                "group": result.case.group,
                "path": result.case.path,
                "matched": outcome.matched_rule.clone().unwrap_or_default(),
                "rewrite_test": expectation.rewrite.clone().unwrap_or_default(),
                "rewrite_result": outcome.basic_result.clone().unwrap_or_default(),
                "query_test": expectation.query.as_ref().map(format_query).unwrap_or_default(),
                "query_result": outcome
                    .structured_result
                    .as_ref()
                    .map(format_query)
                    .unwrap_or_default(),
            }))
        })
        .collect();

    println!("{}", render_items(format, &fields, &rows)?);
    Ok(())
}

/// `summary`: status, errors and coverage of the last run
pub fn show_summary(tester: &RewriteTester, fields: &[String], format: OutputFormat) -> Result<()> {
    let fields = select_fields(fields, SUMMARY_DEFAULT_FIELDS, SUMMARY_FIELDS)?;
    let summary = tester.summary()?;

    let item = row(json!({
        "status": summary.status.to_string(),
        "passing": summary.is_passing(),
        "errors": summary.error_count,
        "total": summary.total,
        "tested": summary.tested,
        "missed": summary.missed,
        "coverage": format!("{}%", summary.coverage_pct),
    }));

    println!("{}", render_item(format, &fields, &item)?);
    Ok(())
}

/// `status`: `Passing` or `Failing`
pub fn show_status(tester: &RewriteTester) -> Result<()> {
    println!("{}", tester.summary()?.status);
    Ok(())
}

/// `passing`: succeed only when the suite passes
pub fn check_passing(tester: &RewriteTester) -> Result<()> {
    let summary = tester.summary()?;
    if summary.is_passing() {
        println!("Success: {}", summary.status);
        Ok(())
    } else {
        Err(anyhow!(
            "{} ({} of the tests failed)",
            summary.status,
            summary.error_count
        ))
    }
}

/// `coverage`: which rules the suite reached
pub fn show_coverage(
    tester: &RewriteTester,
    statuses: &[String],
    format: OutputFormat,
) -> Result<()> {
    let statuses = statuses
        .iter()
        .map(|s| s.parse::<CoverageStatus>().map_err(|e| anyhow!(e)))
        .collect::<Result<Vec<_>>>()?;

    let rows: Vec<Row> = tester
        .coverage_detail(&statuses)?
        .into_iter()
        .map(|r| {
            row(json!({
                "status": r.status.to_string(),
                "match": r.pattern,
                "query": r.rewrite,
                "source": r.source,
            }))
        })
        .collect();

    let fields: Vec<String> = COVERAGE_FIELDS.iter().map(|f| f.to_string()).collect();
    println!("{}", render_items(format, &fields, &rows)?);
    Ok(())
}

/// `rules`: the loaded rule table with provenance
pub fn show_rules(
    tester: &RewriteTester,
    source: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let table = tester.rules()?;

    if let Some(source) = source.filter(|s| *s != ALL_SOURCES) {
        if !table.sources().iter().any(|s| s == source) {
            return Err(anyhow!(
                "Unknown source: {}. Available sources: {}",
                source,
                table.sources().join(", ")
            ));
        }
    }

    let rows: Vec<Row> = table
        .rules()
        .filter(|rule| match source {
            None => true,
            Some(s) => s == ALL_SOURCES || rule.source == s,
        })
        .map(|rule| {
            row(json!({
                "match": rule.pattern,
                "query": rule.rewrite,
                "source": rule.source,
            }))
        })
        .collect();

    let fields: Vec<String> = RULE_FIELDS.iter().map(|f| f.to_string()).collect();
    println!("{}", render_items(format, &fields, &rows)?);
    if format == OutputFormat::Table {
        println!("Sources: {}", table.sources().join(", "));
    }
    Ok(())
}

/// `flush`: forget the stored summary
pub fn flush_summary(tester: &RewriteTester, cache: &CacheConfig) -> Result<()> {
    tester.flush()?;
    println!("{}", flush_message(cache));
    Ok(())
}

/// Only disk storage keeps a summary between invocations
fn flush_message(cache: &CacheConfig) -> String {
    if !cache.enable {
        "Summary cache is disabled; nothing to flush.".to_string()
    } else if cache.storage == CacheStorage::Memory {
        "Success: nothing flushed; memory storage does not outlive the process. \
         Use storage = \"disk\" to keep summaries between runs."
            .to_string()
    } else {
        format!("Success: stored test summary in {} flushed.", cache.disk_path)
    }
}

/// Handle configuration commands
pub fn handle_config_command(
    config_path: &Path,
    overrides: &Overrides,
    cmd: ConfigCommand,
) -> Result<()> {
    match cmd {
        ConfigCommand::Validate => {
            println!("Validating configuration: {:?}", config_path);
            if !config_path.exists() {
                println!("Configuration file not found, using defaults.");
            }

            match load_config(config_path, overrides) {
                Ok(config) => {
                    if let Err(e) = SiteSnapshot::load(&config.site.snapshot) {
                        println!("✗ Site snapshot error: {}", e);
                        return Err(anyhow!("Invalid site snapshot"));
                    }
                    if let Some(cases) = &config.tests.cases {
                        if let Err(e) = TestSuite::load(cases) {
                            println!("✗ Test case error: {}", e);
                            return Err(anyhow!("Invalid test cases"));
                        }
                    }
                    println!("✓ Configuration is valid.");
                }
                Err(e) => {
                    println!("✗ Configuration error: {}", e);
                    return Err(anyhow!("Invalid configuration"));
                }
            }
        }
        ConfigCommand::ShowDefault => {
            let default_config = r#"# rewrite-testing configuration

[site]
# Snapshot of the site's rewrite rules and query vars
snapshot = "site.toml"

[tests]
# Replay the built-in corpus
include_defaults = true
# Extra cases, merged over the built-in ones
# cases = "cases.toml"

[cache]
enable = true
storage = "memory"
# disk_path = "/var/cache/rewrite-testing"
"#;
            println!("{}", default_config);
        }
    }
    Ok(())
}

fn status_label(status: Status) -> &'static str {
    match status {
        Status::Pass => "ok",
        Status::Fail => "error",
    }
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}
