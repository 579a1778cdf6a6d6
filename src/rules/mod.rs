//! Rule Table
//!
//! The ordered rewrite rule table for one run, reconciled against what the
//! host would generate today and tagged with the structure that produced
//! each rule.
//!
//! Rule order is match priority: the first rule whose pattern matches the
//! start of a path wins.

use fancy_regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{RewriteTestError, RunResult};
use crate::host::{RewriteHost, RuleEntry};
use crate::policy::RunPolicy;

/// Pattern that only an empty request path can match
pub const EMPTY_PATH_PATTERN: &str = "$";

/// Source label listed first, meaning "no filter"
pub const ALL_SOURCES: &str = "all";

/// One rule of the loaded table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub pattern: String,
    pub rewrite: String,
    /// Rule family that generated the rule (`post`, `date`, `category`, ...)
    pub source: String,
}

impl Rule {
    pub fn new(
        pattern: impl Into<String>,
        rewrite: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            rewrite: rewrite.into(),
            source: source.into(),
        }
    }
}

/// A rule with its pattern compiled as a start-anchored regex
pub struct CompiledRule {
    rule: Rule,
    /// `None` when the pattern is not a valid regex; such a rule never matches
    regex: Option<Regex>,
}

impl CompiledRule {
    fn compile(rule: Rule) -> Self {
        // Prefix concatenation, not a group: the host anchors rules the same way
        let regex = match Regex::new(&format!("^{}", rule.pattern)) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!("Rewrite rule '{}' does not compile: {}", rule.pattern, e);
                None
            }
        };
        Self { rule, regex }
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn pattern(&self) -> &str {
        &self.rule.pattern
    }

    pub fn rewrite(&self) -> &str {
        &self.rule.rewrite
    }

    /// Match against the start of `path`, returning the capture groups
    pub fn captures<'p>(&self, path: &'p str) -> Option<Captures<'p>> {
        let regex = self.regex.as_ref()?;
        match regex.captures(path) {
            Ok(captures) => captures,
            Err(e) => {
                warn!(
                    "Rewrite rule '{}' failed while matching '{}': {}",
                    self.rule.pattern, path, e
                );
                None
            }
        }
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.captures(path).is_some()
    }
}

impl fmt::Debug for CompiledRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRule")
            .field("rule", &self.rule)
            .field("valid", &self.regex.is_some())
            .finish()
    }
}

/// Ordered, compiled rule table
#[derive(Debug)]
pub struct RuleTable {
    rules: Vec<CompiledRule>,
    sources: Vec<String>,
}

impl RuleTable {
    /// Build the table from the host's persisted rules.
    ///
    /// Fails with [`RewriteTestError::StaleRuleTable`] when the host would
    /// generate rules that are not persisted, and with
    /// [`RewriteTestError::EmptyRuleTable`] when nothing is persisted.
    pub fn load(host: &dyn RewriteHost, policy: &dyn RunPolicy) -> RunResult<Self> {
        let persisted = host.persisted_rules();
        let generated = host.generated_rules();

        // Later families win, as when the host tags rules by source
        let mut source_of: HashMap<&str, &str> = HashMap::new();
        for family in &generated {
            for rule in &family.rules {
                source_of.insert(rule.pattern.as_str(), family.source.as_str());
            }
        }

        let mut seen: HashSet<String> = HashSet::with_capacity(persisted.len());
        let mut rules: Vec<Rule> = Vec::with_capacity(persisted.len());
        for entry in persisted {
            if !seen.insert(entry.pattern.clone()) {
                warn!("Duplicate rewrite rule '{}' ignored", entry.pattern);
                continue;
            }
            let source = match source_of.get(entry.pattern.as_str()) {
                Some(source) => source.to_string(),
                None => policy.unknown_source(&entry.pattern, &entry.rewrite),
            };
            rules.push(Rule::new(entry.pattern, entry.rewrite, source));
        }

        let missing: Vec<RuleEntry> = host
            .regenerated_rules()
            .into_iter()
            .filter(|rule| !seen.contains(&rule.pattern))
            .collect();
        if !missing.is_empty() {
            warn!(
                "{} generated rewrite rules are not persisted; the table needs flushing",
                missing.len()
            );
            return Err(RewriteTestError::StaleRuleTable { missing });
        }

        if rules.is_empty() {
            return Err(RewriteTestError::EmptyRuleTable);
        }

        let table = Self::from_rules(rules);
        info!(
            "Loaded {} rewrite rules from {} sources",
            table.len(),
            table.sources.len() - 1
        );
        Ok(table)
    }

    /// Build a table directly from tagged rules, skipping reconciliation
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        let mut sources = vec![ALL_SOURCES.to_string()];
        for rule in &rules {
            if !sources.contains(&rule.source) {
                sources.push(rule.source.clone());
            }
        }

        let rules: Vec<CompiledRule> = rules.into_iter().map(CompiledRule::compile).collect();
        debug!("Compiled {} rewrite rules", rules.len());

        Self { rules, sources }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter()
    }

    /// Rules in priority order
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(CompiledRule::rule)
    }

    pub fn get(&self, pattern: &str) -> Option<&Rule> {
        self.rules().find(|r| r.pattern == pattern)
    }

    /// Distinct rule sources, `all` first
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
