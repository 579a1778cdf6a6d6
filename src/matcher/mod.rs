//! Rule Matching
//!
//! Two first-match-wins matchers over the same [`RuleTable`]:
//!
//! - [`BasicMatcher`] returns the first matching rule and its raw rewrite
//!   target. It is cheap, and every rule it returns counts as covered.
//! - [`ExtendedMatcher`] resolves a path the way the host's request parser
//!   would: captures substituted into the target, the query string parsed,
//!   and the result filtered through the query var whitelists.

use fancy_regex::Captures;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::host::RewriteHost;
use crate::policy::RunPolicy;
use crate::rules::{CompiledRule, Rule, RuleTable, EMPTY_PATH_PATTERN};

pub mod path;
pub mod query;

pub use path::{normalize_path, query_part};
use query::{parse_query, placeholder_index, strip_to_query, substitute_matches, urldecode};

/// Query variables, ordered by key
pub type QueryVars = BTreeMap<String, String>;

/// Query var set when no rule matched
pub const ERROR_VAR: &str = "error";

/// Everything the matchers found for one test path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Pattern the basic matcher stopped at
    pub matched_rule: Option<String>,
    /// Raw rewrite target of that rule
    pub basic_result: Option<String>,
    /// Pattern the extended matcher stopped at (may differ under verbose
    /// page rules)
    pub query_rule: Option<String>,
    /// Resolved query vars; `None` when the extended matcher was not run
    pub structured_result: Option<QueryVars>,
}

/// Cheap matcher returning raw rewrite targets
pub struct BasicMatcher<'t> {
    table: &'t RuleTable,
}

impl<'t> BasicMatcher<'t> {
    pub fn new(table: &'t RuleTable) -> Self {
        Self { table }
    }

    /// First rule matching the start of `path`
    pub fn find(&self, path: &str) -> Option<&'t Rule> {
        if path.is_empty() {
            return self.table.get(EMPTY_PATH_PATTERN);
        }
        self.table
            .iter()
            .find(|rule| rule.is_match(path))
            .map(CompiledRule::rule)
    }
}

/// Result of resolving a path to query vars
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedMatch {
    pub rule: Option<String>,
    pub query_vars: QueryVars,
}

/// Matcher that resolves paths to the query vars the host would see
pub struct ExtendedMatcher<'a> {
    table: &'a RuleTable,
    host: &'a dyn RewriteHost,
    policy: &'a dyn RunPolicy,
    verbose_pages: bool,
    public_vars: Vec<String>,
    private_vars: Vec<String>,
    post_type_vars: BTreeMap<String, String>,
    queryable_post_types: BTreeSet<String>,
    taxonomy_vars: BTreeMap<String, String>,
}

impl<'a> ExtendedMatcher<'a> {
    /// Create a matcher, reading the host's query var whitelists once
    pub fn new(table: &'a RuleTable, host: &'a dyn RewriteHost, policy: &'a dyn RunPolicy) -> Self {
        Self {
            table,
            host,
            policy,
            verbose_pages: host.uses_verbose_page_rules(),
            public_vars: host.public_query_vars(),
            private_vars: host.private_query_vars(),
            post_type_vars: host.post_type_query_vars(),
            queryable_post_types: host.queryable_post_types(),
            taxonomy_vars: host.taxonomy_query_vars(),
        }
    }

    /// Resolve a normalized path. `extra` holds query vars passed alongside
    /// the request (its own query string); they take priority over the
    /// rewrite and are the only way to set private vars.
    pub fn resolve(&self, path: &str, extra: &QueryVars) -> ExtendedMatch {
        let found = self.find(path);

        let perma = match &found {
            Some((rule, groups)) => {
                let query = substitute_matches(strip_to_query(rule.rewrite()), groups);
                debug!("'{}' rewrites to '{}'", path, query);
                parse_query(&query)
            }
            None => QueryVars::new(),
        };

        let mut vars = QueryVars::new();
        for var in &self.public_vars {
            if let Some(value) = extra.get(var).or_else(|| perma.get(var)) {
                vars.insert(var.clone(), value.clone());
            }
            let Some(post_type) = self.post_type_vars.get(var) else {
                continue;
            };
            if let Some(value) = vars.get(var).filter(|v| !is_blank(v)).cloned() {
                vars.insert("post_type".to_string(), post_type.clone());
                vars.insert("name".to_string(), value);
            }
        }

        // Decoding turned `+` into spaces; term slugs keep their `+`
        for var in self.taxonomy_vars.keys() {
            if let Some(value) = vars.get_mut(var) {
                *value = value.replace(' ', "+");
            }
        }

        if let Some(post_type) = vars.get("post_type") {
            if !self.queryable_post_types.contains(post_type) {
                debug!("Dropping non-queryable post type '{}'", post_type);
                vars.remove("post_type");
            }
        }

        for var in &self.private_vars {
            if let Some(value) = extra.get(var) {
                vars.insert(var.clone(), value.clone());
            }
        }

        if found.is_none() {
            vars.insert(ERROR_VAR.to_string(), "404".to_string());
        }

        ExtendedMatch {
            rule: found.map(|(rule, _)| rule.pattern().to_string()),
            query_vars: self.policy.filter_request(vars),
        }
    }

    fn find(&self, path: &str) -> Option<(&'a CompiledRule, Vec<Option<String>>)> {
        if path.is_empty() {
            return self
                .table
                .iter()
                .find(|rule| rule.pattern() == EMPTY_PATH_PATTERN)
                .map(|rule| (rule, vec![Some(String::new())]));
        }

        let decoded = urldecode(path);
        for rule in self.table.iter() {
            let groups = match rule.captures(path) {
                Some(caps) => capture_groups(&caps),
                None => match rule.captures(&decoded) {
                    Some(caps) => capture_groups(&caps),
                    None => continue,
                },
            };

            if self.verbose_pages && !self.page_exists(rule, &groups) {
                debug!(
                    "'{}' matched page rule '{}' but no such page exists",
                    path,
                    rule.pattern()
                );
                continue;
            }

            return Some((rule, groups));
        }

        None
    }

    /// Verbose page rules are ambiguous with other slugs; only accept one
    /// when the captured page path exists
    fn page_exists(&self, rule: &CompiledRule, groups: &[Option<String>]) -> bool {
        let Some(index) = placeholder_index(rule.rewrite(), "pagename") else {
            return true;
        };
        let page_path = groups
            .get(index)
            .and_then(|group| group.as_deref())
            .unwrap_or("");
        self.host.page_by_path(page_path).is_some()
    }
}

fn capture_groups(caps: &Captures<'_>) -> Vec<Option<String>> {
    (0..caps.len())
        .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
        .collect()
}

/// `""` and `"0"` count as unset
fn is_blank(value: &str) -> bool {
    value.is_empty() || value == "0"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SiteSnapshot;
    use crate::policy::DefaultPolicy;

    const SITE: &str = r#"
        pages = ["query-test", "parent/child"]

        [[post_types]]
        name = "post"

        [[post_types]]
        name = "book"
        query_var = "book"

        [[post_types]]
        name = "draft_box"
        query_var = "draft_box"
        publicly_queryable = false

        [[taxonomies]]
        name = "post_tag"
        query_var = "tag"

        [[rules]]
        pattern = '$'
        rewrite = 'index.php?home=1'

        [[rules]]
        pattern = 'category/(.+?)/feed/(feed|rdf|rss|rss2|atom)/?$'
        rewrite = 'index.php?category_name=$matches[1]&feed=$matches[2]'

        [[rules]]
        pattern = 'category/(.+?)/?$'
        rewrite = 'index.php?category_name=$matches[1]'

        [[rules]]
        pattern = 'tag/([^/]+)/?$'
        rewrite = 'index.php?tag=$matches[1]'

        [[rules]]
        pattern = 'book/([^/]+)/?$'
        rewrite = 'index.php?book=$matches[1]'

        [[rules]]
        pattern = 'drafts/([^/]+)/?$'
        rewrite = 'index.php?draft_box=$matches[1]'

        [[rules]]
        pattern = 'search/(.+)/?$'
        rewrite = 'index.php?s=$matches[1]'

        [[rules]]
        pattern = 'café/?$'
        rewrite = 'index.php?pagename=cafe'

        [[rules]]
        pattern = '(.?.+?)(?:/([0-9]+))?/?$'
        rewrite = 'index.php?pagename=$matches[1]&page=$matches[2]'

        [[rules]]
        pattern = '([^/]+)/?$'
        rewrite = 'index.php?name=$matches[1]'
    "#;

    fn site() -> SiteSnapshot {
        SiteSnapshot::from_str(SITE).unwrap()
    }

    fn vars(pairs: &[(&str, &str)]) -> QueryVars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_basic_first_match_wins() {
        let table = RuleTable::from_rules(vec![
            Rule::new("category/(.+)/?$", "first", "category"),
            Rule::new("category/(.+?)/feed/?$", "second", "category"),
        ]);
        let matcher = BasicMatcher::new(&table);
        let rule = matcher.find("category/news/feed/").unwrap();
        assert_eq!(rule.rewrite, "first");
    }

    #[test]
    fn test_basic_returns_template_verbatim() {
        let site = site();
        let table = RuleTable::load(&site, &DefaultPolicy).unwrap();
        let matcher = BasicMatcher::new(&table);

        let rule = matcher.find("category/news/feed/atom/").unwrap();
        assert_eq!(rule.pattern, "category/(.+?)/feed/(feed|rdf|rss|rss2|atom)/?$");
        assert_eq!(
            rule.rewrite,
            "index.php?category_name=$matches[1]&feed=$matches[2]"
        );
    }

    #[test]
    fn test_basic_empty_path_only_matches_sentinel() {
        let table = RuleTable::from_rules(vec![Rule::new("(.*)", "index.php?any=1", "other")]);
        assert!(BasicMatcher::new(&table).find("").is_none());

        let site = site();
        let table = RuleTable::load(&site, &DefaultPolicy).unwrap();
        let rule = BasicMatcher::new(&table).find("").unwrap();
        assert_eq!(rule.rewrite, "index.php?home=1");
    }

    #[test]
    fn test_basic_no_match() {
        let table = RuleTable::from_rules(vec![Rule::new("tag/([^/]+)/?$", "t", "post_tag")]);
        assert!(BasicMatcher::new(&table).find("totally/unknown/xyz/").is_none());
    }

    #[test]
    fn test_extended_page_query() {
        let site = site();
        let table = RuleTable::load(&site, &DefaultPolicy).unwrap();
        let matcher = ExtendedMatcher::new(&table, &site, &DefaultPolicy);

        let found = matcher.resolve("query-test/", &QueryVars::new());
        assert_eq!(found.rule.as_deref(), Some("(.?.+?)(?:/([0-9]+))?/?$"));
        assert_eq!(found.query_vars, vars(&[("page", ""), ("pagename", "query-test")]));
    }

    #[test]
    fn test_extended_no_match_sets_404() {
        let table = RuleTable::from_rules(vec![Rule::new(
            "tag/([^/]+)/?$",
            "index.php?tag=$matches[1]",
            "post_tag",
        )]);
        let site = site();
        let matcher = ExtendedMatcher::new(&table, &site, &DefaultPolicy);

        let found = matcher.resolve("totally/unknown/xyz/", &QueryVars::new());
        assert_eq!(found.rule, None);
        assert_eq!(found.query_vars, vars(&[("error", "404")]));
    }

    #[test]
    fn test_extended_retries_decoded_path() {
        let site = site();
        let table = RuleTable::load(&site, &DefaultPolicy).unwrap();
        let matcher = ExtendedMatcher::new(&table, &site, &DefaultPolicy);

        let found = matcher.resolve("caf%C3%A9/", &QueryVars::new());
        assert_eq!(found.rule.as_deref(), Some("café/?$"));
        assert_eq!(found.query_vars, vars(&[("pagename", "cafe")]));
    }

    #[test]
    fn test_extended_verbose_page_rule_requires_page() {
        let mut site = site();
        site.verbose_page_rules = true;
        let table = RuleTable::load(&site, &DefaultPolicy).unwrap();
        let matcher = ExtendedMatcher::new(&table, &site, &DefaultPolicy);

        let page = matcher.resolve("parent/child/", &QueryVars::new());
        assert_eq!(page.query_vars.get("pagename").map(String::as_str), Some("parent/child"));

        // Not a page: falls through to the post name rule
        let post = matcher.resolve("hello-world/", &QueryVars::new());
        assert_eq!(post.rule.as_deref(), Some("([^/]+)/?$"));
        assert_eq!(post.query_vars, vars(&[("name", "hello-world")]));
    }

    #[test]
    fn test_extended_post_type_query_var() {
        let site = site();
        let table = RuleTable::load(&site, &DefaultPolicy).unwrap();
        let matcher = ExtendedMatcher::new(&table, &site, &DefaultPolicy);

        let found = matcher.resolve("book/dune/", &QueryVars::new());
        assert_eq!(
            found.query_vars,
            vars(&[("book", "dune"), ("name", "dune"), ("post_type", "book")])
        );

        let hidden = matcher.resolve("drafts/secret/", &QueryVars::new());
        assert_eq!(
            hidden.query_vars,
            vars(&[("draft_box", "secret"), ("name", "secret")])
        );
    }

    #[test]
    fn test_extended_taxonomy_keeps_plus() {
        let site = site();
        let table = RuleTable::load(&site, &DefaultPolicy).unwrap();
        let matcher = ExtendedMatcher::new(&table, &site, &DefaultPolicy);

        let tag = matcher.resolve("tag/rock roll/", &QueryVars::new());
        assert_eq!(tag.query_vars, vars(&[("tag", "rock+roll")]));

        // Search is not a taxonomy, so the space survives
        let search = matcher.resolve("search/rock roll", &QueryVars::new());
        assert_eq!(search.query_vars, vars(&[("s", "rock roll")]));

        let literal = matcher.resolve("search/rock+roll", &QueryVars::new());
        assert_eq!(literal.query_vars, vars(&[("s", "rock+roll")]));
    }

    #[test]
    fn test_extended_extra_vars() {
        let site = site();
        let table = RuleTable::load(&site, &DefaultPolicy).unwrap();
        let matcher = ExtendedMatcher::new(&table, &site, &DefaultPolicy);

        let extra = vars(&[("feed", "rss2"), ("posts_per_page", "5"), ("bogus", "1")]);
        let found = matcher.resolve("category/news/", &extra);
        assert_eq!(
            found.query_vars,
            vars(&[("category_name", "news"), ("feed", "rss2"), ("posts_per_page", "5")])
        );
    }

    #[test]
    fn test_extended_request_filter() {
        struct Paged;
        impl RunPolicy for Paged {
            fn filter_request(&self, mut query_vars: QueryVars) -> QueryVars {
                query_vars.insert("paged".to_string(), "1".to_string());
                query_vars
            }
        }

        let site = site();
        let table = RuleTable::load(&site, &DefaultPolicy).unwrap();
        let matcher = ExtendedMatcher::new(&table, &site, &Paged);

        let found = matcher.resolve("tag/hello/", &QueryVars::new());
        assert_eq!(found.query_vars, vars(&[("paged", "1"), ("tag", "hello")]));
    }

    #[test]
    fn test_extended_empty_path() {
        let site = site();
        let table = RuleTable::load(&site, &DefaultPolicy).unwrap();
        let matcher = ExtendedMatcher::new(&table, &site, &DefaultPolicy);

        let found = matcher.resolve("", &QueryVars::new());
        assert_eq!(found.rule.as_deref(), Some("$"));
        // `home` is not a public query var
        assert!(found.query_vars.is_empty());
    }
}
