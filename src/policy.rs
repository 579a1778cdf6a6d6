//! Run Policy
//!
//! Extension points a host can use to adjust a run without forking the
//! engine. Every method has a pass-through default.

use crate::cases::TestCase;
use crate::matcher::{MatchOutcome, QueryVars};

pub trait RunPolicy: Send + Sync {
    /// Final say on whether a case passed
    fn finalize(&self, passed: bool, _case: &TestCase, _outcome: &MatchOutcome) -> bool {
        passed
    }

    /// Post-process the query vars produced by the extended matcher
    fn filter_request(&self, query_vars: QueryVars) -> QueryVars {
        query_vars
    }

    /// Provenance for a persisted rule no known structure generates
    fn unknown_source(&self, _pattern: &str, _rewrite: &str) -> String {
        "other".to_string()
    }
}

/// Policy with every hook left at its default
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl RunPolicy for DefaultPolicy {}
