//! Errors surfaced by a test run
//!
//! These describe configuration problems in the host site, not transient
//! faults, so none of them are retried.

use crate::host::RuleEntry;
use thiserror::Error;

/// Result type for rule-table and run operations
pub type RunResult<T> = Result<T, RewriteTestError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteTestError {
    /// Rules the host would generate today are absent from the persisted table
    #[error("The site's rewrite rules need to be flushed ({} missing)", missing.len())]
    StaleRuleTable { missing: Vec<RuleEntry> },

    #[error("The rewrite rules look to be missing. Try flushing or check your permalink settings.")]
    EmptyRuleTable,

    #[error("No tests found")]
    EmptyTestSuite,

    /// Only raised by filtered listings
    #[error("No matching tests found for groups: {}", requested.join(", "))]
    NoMatchingGroup { requested: Vec<String> },
}

impl RewriteTestError {
    /// Short machine-readable code, stable across releases
    pub fn code(&self) -> &'static str {
        match self {
            RewriteTestError::StaleRuleTable { .. } => "missing_rules",
            RewriteTestError::EmptyRuleTable => "empty_rules",
            RewriteTestError::EmptyTestSuite => "no_tests",
            RewriteTestError::NoMatchingGroup { .. } => "no_matching_tests",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_message_counts_missing() {
        let err = RewriteTestError::StaleRuleTable {
            missing: vec![
                RuleEntry::new("a/?$", "index.php?a=1"),
                RuleEntry::new("b/?$", "index.php?b=1"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "The site's rewrite rules need to be flushed (2 missing)"
        );
        assert_eq!(err.code(), "missing_rules");
    }

    #[test]
    fn test_no_matching_group_lists_request() {
        let err = RewriteTestError::NoMatchingGroup {
            requested: vec!["Tags".to_string(), "Nope".to_string()],
        };
        assert!(err.to_string().ends_with("Tags, Nope"));
    }
}
