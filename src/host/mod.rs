//! Host Site Interface
//!
//! The rewrite tester does not generate or serve rules itself. Everything it
//! needs to know about the site (the persisted rule table, what the permalink
//! structures would generate today, pages, query var whitelists) comes through
//! the [`RewriteHost`] trait.
//!
//! [`SiteSnapshot`] is the bundled implementation, read from a TOML file.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub mod snapshot;

pub use snapshot::{SiteSnapshot, SnapshotError};

/// One raw `pattern => rewrite` pair as stored or generated by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    /// Regular expression, matched against the start of the request path
    pub pattern: String,
    /// Rewrite target, usually `index.php?var=$matches[1]&...`
    pub rewrite: String,
}

impl RuleEntry {
    pub fn new(pattern: impl Into<String>, rewrite: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            rewrite: rewrite.into(),
        }
    }
}

/// Rules generated by one structural rule family (post, date, page, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRules {
    pub source: String,
    pub rules: Vec<RuleEntry>,
}

impl SourceRules {
    pub fn contains(&self, pattern: &str) -> bool {
        self.rules.iter().any(|r| r.pattern == pattern)
    }
}

/// A page known to the content store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Hierarchical path, e.g. `parent/child`
    pub path: String,
}

/// Everything the tester borrows from the host site
pub trait RewriteHost: Send + Sync {
    /// The rule table currently persisted by the host, in priority order
    fn persisted_rules(&self) -> Vec<RuleEntry>;

    /// Rules the host's structures would generate right now, per source
    fn generated_rules(&self) -> Vec<SourceRules>;

    /// The full table the host would build if flushed now.
    ///
    /// Defaults to the union of [`generated_rules`](Self::generated_rules):
    /// the first occurrence of a pattern keeps its position, a later one
    /// replaces its rewrite.
    fn regenerated_rules(&self) -> Vec<RuleEntry> {
        let mut merged: Vec<RuleEntry> = Vec::new();
        for family in self.generated_rules() {
            for rule in family.rules {
                match merged.iter_mut().find(|r| r.pattern == rule.pattern) {
                    Some(existing) => existing.rewrite = rule.rewrite,
                    None => merged.push(rule),
                }
            }
        }
        merged
    }

    /// Look up a page by its hierarchical path
    fn page_by_path(&self, path: &str) -> Option<Page>;

    /// Whether page rules are evaluated before post rules and need an
    /// existence check to resolve ambiguity
    fn uses_verbose_page_rules(&self) -> bool;

    /// Whitelisted query vars that may come from a rewrite, in host order
    fn public_query_vars(&self) -> Vec<String>;

    /// Query vars that may only be set programmatically
    fn private_query_vars(&self) -> Vec<String>;

    /// Post type query var => post type name
    fn post_type_query_vars(&self) -> BTreeMap<String, String>;

    /// Post types that may be requested publicly
    fn queryable_post_types(&self) -> BTreeSet<String>;

    /// Taxonomy query var => taxonomy name
    fn taxonomy_query_vars(&self) -> BTreeMap<String, String>;

    /// Path component of the site's home URL when installed in a
    /// subdirectory, without trailing slash
    fn home_path(&self) -> Option<String>;
}
