//! Result comparison

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cases::{Expectation, TestCase};
use crate::matcher::MatchOutcome;
use crate::policy::RunPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Fail,
}

impl Status {
    pub fn is_pass(self) -> bool {
        self == Status::Pass
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Pass => write!(f, "pass"),
            Status::Fail => write!(f, "fail"),
        }
    }
}

/// Literal rewrite expectation holds; vacuously true when absent
pub fn rewrite_matches(expectation: &Expectation, outcome: &MatchOutcome) -> bool {
    match &expectation.rewrite {
        Some(expected) => outcome.basic_result.as_deref() == Some(expected.as_str()),
        None => true,
    }
}

/// Query expectation holds; vacuously true when absent
pub fn query_matches(expectation: &Expectation, outcome: &MatchOutcome) -> bool {
    match &expectation.query {
        Some(expected) => outcome.structured_result.as_ref() == Some(expected),
        None => true,
    }
}

/// Judge one case, giving the policy the last word
pub fn judge(case: &TestCase, outcome: &MatchOutcome, policy: &dyn RunPolicy) -> Status {
    let passed =
        rewrite_matches(&case.expectation, outcome) && query_matches(&case.expectation, outcome);
    if policy.finalize(passed, case, outcome) {
        Status::Pass
    } else {
        Status::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::QueryVars;
    use crate::policy::DefaultPolicy;

    fn vars(pairs: &[(&str, &str)]) -> QueryVars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn case(expectation: Expectation) -> TestCase {
        TestCase {
            group: "Pages".to_string(),
            path: "/query-test/".to_string(),
            expectation,
        }
    }

    fn outcome(basic: Option<&str>, structured: Option<QueryVars>) -> MatchOutcome {
        MatchOutcome {
            matched_rule: basic.map(|_| "(.?.+?)(?:/([0-9]+))?/?$".to_string()),
            basic_result: basic.map(str::to_string),
            query_rule: None,
            structured_result: structured,
        }
    }

    #[test]
    fn test_rewrite_is_strict_equality() {
        let expect = case(Expectation::rewrite("index.php?pagename=$matches[1]"));
        let hit = outcome(Some("index.php?pagename=$matches[1]"), None);
        let near = outcome(Some("index.php?pagename=$matches[1]&page=$matches[2]"), None);

        assert_eq!(judge(&expect, &hit, &DefaultPolicy), Status::Pass);
        assert_eq!(judge(&expect, &near, &DefaultPolicy), Status::Fail);
        assert_eq!(judge(&expect, &outcome(None, None), &DefaultPolicy), Status::Fail);
    }

    #[test]
    fn test_empty_rewrite_is_not_no_match() {
        let expect = case(Expectation::rewrite(""));
        assert_eq!(judge(&expect, &outcome(None, None), &DefaultPolicy), Status::Fail);
        assert_eq!(judge(&expect, &outcome(Some(""), None), &DefaultPolicy), Status::Pass);
    }

    #[test]
    fn test_query_ignores_key_order() {
        let expected = vars(&[("pagename", "query-test"), ("page", "")]);
        let actual = vars(&[("page", ""), ("pagename", "query-test")]);
        let expect = case(Expectation::query(expected));

        assert_eq!(
            judge(&expect, &outcome(Some("x"), Some(actual)), &DefaultPolicy),
            Status::Pass
        );
        assert_eq!(
            judge(&expect, &outcome(Some("x"), None), &DefaultPolicy),
            Status::Fail
        );
    }

    #[test]
    fn test_both_expectations_must_hold() {
        let expect = case(Expectation {
            rewrite: Some("index.php?pagename=$matches[1]&page=$matches[2]".to_string()),
            query: Some(vars(&[("pagename", "query-test"), ("page", "")])),
        });
        let wrong_query = outcome(
            Some("index.php?pagename=$matches[1]&page=$matches[2]"),
            Some(vars(&[("pagename", "other")])),
        );
        assert_eq!(judge(&expect, &wrong_query, &DefaultPolicy), Status::Fail);
    }

    #[test]
    fn test_policy_can_override() {
        struct Lenient;
        impl RunPolicy for Lenient {
            fn finalize(&self, _passed: bool, case: &TestCase, _outcome: &MatchOutcome) -> bool {
                case.group == "Pages"
            }
        }

        let expect = case(Expectation::rewrite("nope"));
        assert_eq!(judge(&expect, &outcome(None, None), &Lenient), Status::Pass);
    }
}
