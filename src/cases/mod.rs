//! Test Cases
//!
//! A test suite is an ordered list of named groups, each an ordered list of
//! request paths with what they are expected to resolve to. Suites come from
//! the built-in corpus ([`defaults`]) and/or a TOML case file:
//!
//! ```toml
//! [[group]]
//! name = "Categories"
//!
//! [[group.case]]
//! path = "/category/uncategorized/"
//! match = 'index.php?category_name=$matches[1]'
//!
//! [group.case.query]
//! category_name = "uncategorized"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::error::{RewriteTestError, RunResult};
use crate::matcher::QueryVars;

pub mod defaults;

#[derive(Error, Debug)]
pub enum SuiteError {
    #[error("Failed to read case file '{}': {source}", path.display())]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse case file: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid test case: {0}")]
    ValidationError(String),
}

/// What a path is expected to resolve to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectation {
    /// Raw rewrite target of the first matching rule
    #[serde(default, rename = "match", skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<String>,

    /// Query vars after full resolution; compared ignoring key order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryVars>,
}

impl Expectation {
    pub fn rewrite(rewrite: impl Into<String>) -> Self {
        Self {
            rewrite: Some(rewrite.into()),
            query: None,
        }
    }

    pub fn query(query: QueryVars) -> Self {
        Self {
            rewrite: None,
            query: Some(query),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rewrite.is_none() && self.query.is_none()
    }
}

/// One path to replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub group: String,
    pub path: String,
    pub expectation: Expectation,
}

/// Named, ordered list of cases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseGroup {
    pub name: String,
    cases: Vec<TestCase>,
}

impl CaseGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    /// Add a case; a path already in the group is replaced in place
    pub fn insert(&mut self, path: impl Into<String>, expectation: Expectation) {
        let path = path.into();
        match self.cases.iter_mut().find(|c| c.path == path) {
            Some(existing) => existing.expectation = expectation,
            None => self.cases.push(TestCase {
                group: self.name.clone(),
                path,
                expectation,
            }),
        }
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Ordered collection of case groups
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSuite {
    groups: Vec<CaseGroup>,
}

impl TestSuite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group by name, created at the end if absent
    pub fn group_mut(&mut self, name: &str) -> &mut CaseGroup {
        let idx = match self.groups.iter().position(|g| g.name == name) {
            Some(idx) => idx,
            None => {
                self.groups.push(CaseGroup::new(name));
                self.groups.len() - 1
            }
        };
        &mut self.groups[idx]
    }

    pub fn insert(&mut self, group: &str, path: impl Into<String>, expectation: Expectation) {
        self.group_mut(group).insert(path, expectation);
    }

    /// Merge another suite: groups are extended, repeated paths replaced
    pub fn merge(&mut self, other: TestSuite) {
        for group in other.groups {
            let target = self.group_mut(&group.name);
            for case in group.cases {
                target.insert(case.path, case.expectation);
            }
        }
    }

    pub fn groups(&self) -> &[CaseGroup] {
        &self.groups
    }

    /// All cases, group then insertion order
    pub fn cases(&self) -> impl Iterator<Item = &TestCase> {
        self.groups.iter().flat_map(|g| g.cases.iter())
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(CaseGroup::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cases of the named groups, in suite order.
    ///
    /// `None` or an empty filter lists everything.
    pub fn filter(&self, groups: Option<&[String]>) -> RunResult<Vec<TestCase>> {
        if self.is_empty() {
            return Err(RewriteTestError::EmptyTestSuite);
        }

        let selected: Vec<TestCase> = match groups.filter(|g| !g.is_empty()) {
            None => self.cases().cloned().collect(),
            Some(wanted) => {
                let cases: Vec<TestCase> = self
                    .groups
                    .iter()
                    .filter(|g| wanted.contains(&g.name))
                    .flat_map(|g| g.cases.iter().cloned())
                    .collect();
                if cases.is_empty() {
                    return Err(RewriteTestError::NoMatchingGroup {
                        requested: wanted.to_vec(),
                    });
                }
                cases
            }
        };

        Ok(selected)
    }

    /// Load a suite from a TOML case file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SuiteError> {
        let contents = std::fs::read_to_string(&path).map_err(|e| SuiteError::IoError {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        let suite = Self::from_str(&contents)?;
        debug!(
            "Loaded {} test cases from {}",
            suite.len(),
            path.as_ref().display()
        );
        Ok(suite)
    }

    /// Parse a suite from TOML
    pub fn from_str(contents: &str) -> Result<Self, SuiteError> {
        let file: CaseFile = toml::from_str(contents)?;
        let mut suite = TestSuite::new();

        for group in file.group {
            if group.name.trim().is_empty() {
                return Err(SuiteError::ValidationError(
                    "group name must not be empty".to_string(),
                ));
            }
            let target = suite.group_mut(&group.name);
            for case in group.case {
                let expectation = Expectation {
                    rewrite: case.rewrite,
                    query: case.query,
                };
                if expectation.is_empty() {
                    return Err(SuiteError::ValidationError(format!(
                        "case '{}' in group '{}' has neither `match` nor `query`",
                        case.path, group.name
                    )));
                }
                target.insert(case.path, expectation);
            }
        }

        Ok(suite)
    }
}

#[derive(Debug, Deserialize)]
struct CaseFile {
    #[serde(default)]
    group: Vec<GroupFile>,
}

#[derive(Debug, Deserialize)]
struct GroupFile {
    name: String,
    #[serde(default)]
    case: Vec<CaseEntry>,
}

#[derive(Debug, Deserialize)]
struct CaseEntry {
    path: String,
    #[serde(default, rename = "match")]
    rewrite: Option<String>,
    #[serde(default)]
    query: Option<QueryVars>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CASES: &str = r#"
        [[group]]
        name = "Tags"

        [[group.case]]
        path = "/tag/hello/"
        match = 'index.php?tag=$matches[1]'

        [[group.case]]
        path = "/tag/hello/feed/"
        match = 'index.php?tag=$matches[1]&feed=$matches[2]'

        [group.case.query]
        tag = "hello"
        feed = "feed"

        [[group]]
        name = "Pages"

        [[group.case]]
        path = "/query-test/"

        [group.case.query]
        pagename = "query-test"
        page = ""
    "#;

    #[test]
    fn test_parse_case_file() {
        let suite = TestSuite::from_str(CASES).unwrap();
        assert_eq!(suite.groups().len(), 2);
        assert_eq!(suite.len(), 3);

        let feed = &suite.groups()[0].cases()[1];
        assert_eq!(feed.group, "Tags");
        assert!(feed.expectation.rewrite.is_some());
        let query = feed.expectation.query.as_ref().unwrap();
        assert_eq!(query.get("feed").map(String::as_str), Some("feed"));

        let page = &suite.groups()[1].cases()[0];
        assert!(page.expectation.rewrite.is_none());
        assert_eq!(page.expectation.query.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_case_needs_an_expectation() {
        let toml = r#"
            [[group]]
            name = "Broken"

            [[group.case]]
            path = "/nothing/"
        "#;
        assert!(matches!(
            TestSuite::from_str(toml),
            Err(SuiteError::ValidationError(_))
        ));
    }

    #[test]
    fn test_query_values_must_be_strings() {
        let toml = r#"
            [[group]]
            name = "Typed"

            [[group.case]]
            path = "/page/2/"

            [group.case.query]
            paged = 2
        "#;
        assert!(matches!(
            TestSuite::from_str(toml),
            Err(SuiteError::ParseError(_))
        ));
    }

    #[test]
    fn test_merge_extends_groups_and_replaces_paths() {
        let mut suite = TestSuite::new();
        suite.insert("Tags", "/tag/hello/", Expectation::rewrite("old"));
        suite.insert("Misc", "/robots.txt", Expectation::rewrite("index.php?robots=1"));

        suite.merge(TestSuite::from_str(CASES).unwrap());

        let names: Vec<&str> = suite.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Tags", "Misc", "Pages"]);

        let tags = &suite.groups()[0];
        assert_eq!(tags.len(), 2);
        assert_eq!(
            tags.cases()[0].expectation.rewrite.as_deref(),
            Some("index.php?tag=$matches[1]")
        );
    }

    #[test]
    fn test_filter_groups() {
        let suite = TestSuite::from_str(CASES).unwrap();

        assert_eq!(suite.filter(None).unwrap().len(), 3);
        assert_eq!(suite.filter(Some(&[])).unwrap().len(), 3);

        let pages = suite.filter(Some(&["Pages".to_string()])).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].path, "/query-test/");

        let missing = suite.filter(Some(&["Nope".to_string()]));
        assert!(matches!(
            missing,
            Err(RewriteTestError::NoMatchingGroup { .. })
        ));
    }

    #[test]
    fn test_filter_empty_suite() {
        assert_eq!(
            TestSuite::new().filter(None),
            Err(RewriteTestError::EmptyTestSuite)
        );
    }
}
