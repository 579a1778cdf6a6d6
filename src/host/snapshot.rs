//! Site Snapshot
//!
//! A TOML record of the host state the tester needs. It stands in for a live
//! site: the persisted rule table, which structure generated each rule, the
//! pages that exist and the query var whitelists.
//!
//! ```toml
//! home_url = "http://example.com/blog"
//! verbose_page_rules = false
//! pages = ["about", "parent/child"]
//!
//! [[taxonomies]]
//! name = "category"
//! query_var = "category_name"
//!
//! [[rules]]
//! pattern = 'category/(.+?)/?$'
//! rewrite = 'index.php?category_name=$matches[1]'
//! source = "category"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::{Page, RewriteHost, RuleEntry, SourceRules};

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Failed to read site snapshot '{}': {source}", path.display())]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse site snapshot: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid site snapshot: {0}")]
    ValidationError(String),
}

/// Recorded host state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSnapshot {
    /// Home URL; its path is the subdirectory stripped from test paths
    #[serde(default)]
    pub home_url: Option<String>,

    /// Page rules come before post rules and need a page existence check
    #[serde(default)]
    pub verbose_page_rules: bool,

    /// Hierarchical paths of published pages
    #[serde(default)]
    pub pages: Vec<String>,

    /// Core public query vars (post type and taxonomy vars are appended)
    #[serde(default = "default_public_query_vars")]
    pub public_query_vars: Vec<String>,

    /// Core private query vars
    #[serde(default = "default_private_query_vars")]
    pub private_query_vars: Vec<String>,

    #[serde(default)]
    pub post_types: Vec<PostTypeSnapshot>,

    #[serde(default)]
    pub taxonomies: Vec<TaxonomySnapshot>,

    /// Rule table in priority order
    #[serde(default)]
    pub rules: Vec<SnapshotRule>,
}

impl Default for SiteSnapshot {
    fn default() -> Self {
        Self {
            home_url: None,
            verbose_page_rules: false,
            pages: vec![],
            public_query_vars: default_public_query_vars(),
            private_query_vars: default_private_query_vars(),
            post_types: vec![],
            taxonomies: vec![],
            rules: vec![],
        }
    }
}

/// One rule as recorded in the snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRule {
    pub pattern: String,
    pub rewrite: String,

    /// Structure that generates this rule today, if any
    #[serde(default)]
    pub source: Option<String>,

    /// Present in the persisted table. A generated rule with
    /// `persisted = false` means the table needs flushing.
    #[serde(default = "default_true")]
    pub persisted: bool,
}

/// Registered post type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostTypeSnapshot {
    pub name: String,

    #[serde(default)]
    pub query_var: Option<String>,

    #[serde(default = "default_true")]
    pub publicly_queryable: bool,
}

/// Registered taxonomy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomySnapshot {
    pub name: String,

    #[serde(default)]
    pub query_var: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_public_query_vars() -> Vec<String> {
    [
        "m", "p", "posts", "w", "cat", "withcomments", "withoutcomments", "s", "search", "exact",
        "sentence", "calendar", "page", "paged", "more", "tb", "pb", "author", "order", "orderby",
        "year", "monthnum", "day", "hour", "minute", "second", "name", "category_name", "tag",
        "feed", "author_name", "static", "pagename", "page_id", "error", "attachment",
        "attachment_id", "subpost", "subpost_id", "preview", "robots", "taxonomy", "term",
        "cpage", "post_type", "embed",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_private_query_vars() -> Vec<String> {
    [
        "offset", "posts_per_page", "posts_per_archive_page", "showposts", "nopaging",
        "post_type", "post_status", "category__in", "category__not_in", "category__and",
        "tag__in", "tag__not_in", "tag__and", "tag_slug__in", "tag_slug__and", "tag_id",
        "post_mime_type", "perm", "comments_per_page", "post__in", "post__not_in",
        "post_parent", "post_parent__in", "post_parent__not_in", "title", "fields",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl SiteSnapshot {
    /// Load a snapshot from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let contents =
            std::fs::read_to_string(&path).map_err(|e| SnapshotError::IoError {
                path: path.as_ref().to_path_buf(),
                source: e,
            })?;
        Self::from_str(&contents)
    }

    /// Load a snapshot from a string
    pub fn from_str(contents: &str) -> Result<Self, SnapshotError> {
        let snapshot: SiteSnapshot = toml::from_str(contents)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn validate(&self) -> Result<(), SnapshotError> {
        if let Some(rule) = self.rules.iter().find(|r| r.source.as_deref() == Some("")) {
            return Err(SnapshotError::ValidationError(format!(
                "rule '{}' has an empty source",
                rule.pattern
            )));
        }
        if let Some(rule) = self
            .rules
            .iter()
            .find(|r| !r.persisted && r.source.is_none())
        {
            return Err(SnapshotError::ValidationError(format!(
                "rule '{}' is neither persisted nor generated",
                rule.pattern
            )));
        }
        Ok(())
    }
}

impl RewriteHost for SiteSnapshot {
    fn persisted_rules(&self) -> Vec<RuleEntry> {
        self.rules
            .iter()
            .filter(|r| r.persisted)
            .map(|r| RuleEntry::new(&r.pattern, &r.rewrite))
            .collect()
    }

    fn generated_rules(&self) -> Vec<SourceRules> {
        let mut families: Vec<SourceRules> = Vec::new();
        for rule in &self.rules {
            let Some(source) = rule.source.as_deref() else {
                continue;
            };
            let entry = RuleEntry::new(&rule.pattern, &rule.rewrite);
            match families.iter_mut().find(|f| f.source == source) {
                Some(family) => family.rules.push(entry),
                None => families.push(SourceRules {
                    source: source.to_string(),
                    rules: vec![entry],
                }),
            }
        }
        families
    }

    fn page_by_path(&self, path: &str) -> Option<Page> {
        let wanted = path.trim_matches('/');
        if wanted.is_empty() {
            return None;
        }
        self.pages
            .iter()
            .map(|p| p.trim_matches('/'))
            .find(|p| p.eq_ignore_ascii_case(wanted))
            .map(|p| Page {
                path: p.to_string(),
            })
    }

    fn uses_verbose_page_rules(&self) -> bool {
        self.verbose_page_rules
    }

    fn public_query_vars(&self) -> Vec<String> {
        let mut vars = self.public_query_vars.clone();
        let registered = self
            .post_types
            .iter()
            .filter_map(|t| t.query_var.as_ref())
            .chain(self.taxonomies.iter().filter_map(|t| t.query_var.as_ref()));
        for var in registered {
            if !var.is_empty() && !vars.contains(var) {
                vars.push(var.clone());
            }
        }
        vars
    }

    fn private_query_vars(&self) -> Vec<String> {
        self.private_query_vars.clone()
    }

    fn post_type_query_vars(&self) -> BTreeMap<String, String> {
        self.post_types
            .iter()
            .filter_map(|t| {
                t.query_var
                    .as_ref()
                    .filter(|v| !v.is_empty())
                    .map(|v| (v.clone(), t.name.clone()))
            })
            .collect()
    }

    fn queryable_post_types(&self) -> BTreeSet<String> {
        self.post_types
            .iter()
            .filter(|t| t.publicly_queryable)
            .map(|t| t.name.clone())
            .collect()
    }

    fn taxonomy_query_vars(&self) -> BTreeMap<String, String> {
        self.taxonomies
            .iter()
            .filter_map(|t| {
                t.query_var
                    .as_ref()
                    .filter(|v| !v.is_empty())
                    .map(|v| (v.clone(), t.name.clone()))
            })
            .collect()
    }

    fn home_path(&self) -> Option<String> {
        let url = self.home_url.as_deref()?;
        let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
        let path = without_scheme
            .find('/')
            .map(|idx| &without_scheme[idx..])
            .unwrap_or("");
        let path = path.trim_end_matches('/');
        if path.is_empty() {
            None
        } else {
            Some(path.to_string())
        }
    }
}
