//! rewrite-testing - Test a site's rewrite rules against known request paths
//!
//! Replays a corpus of sample request paths against a site's ordered rewrite
//! rule table and reports:
//! - which paths do not resolve to what they should
//! - which rules no path ever reaches (coverage)
//! - whether the persisted table is missing rules the site would generate
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rewrite_testing::cache::SummaryCache;
//! use rewrite_testing::cases::defaults::default_suite;
//! use rewrite_testing::config::CacheConfig;
//! use rewrite_testing::{RewriteTester, SiteSnapshot};
//!
//! let site = SiteSnapshot::load("site.toml").unwrap();
//! let store = SummaryCache::new(&CacheConfig::default());
//! let tester = RewriteTester::new(Arc::new(site), Arc::new(store), default_suite());
//!
//! let summary = tester.summary().unwrap();
//! println!("{} ({}% of rules tested)", summary.status, summary.coverage_pct);
//! ```

pub mod cache;
pub mod cases;
pub mod cli;
pub mod compare;
pub mod config;
pub mod coverage;
pub mod error;
pub mod host;
pub mod matcher;
pub mod policy;
pub mod rules;
pub mod runner;
pub mod tester;

pub use config::Config;
pub use error::{RewriteTestError, RunResult};
pub use host::{RewriteHost, SiteSnapshot};
pub use policy::{DefaultPolicy, RunPolicy};
pub use tester::RewriteTester;

/// rewrite-testing version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
