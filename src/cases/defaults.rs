//! Built-in test corpus
//!
//! Paths every site with a `/%year%/%monthnum%/%day%/%postname%/` permalink
//! structure should route the same way, grouped by the structure that
//! generates their rules.

use super::{Expectation, TestSuite};

type Group = (&'static str, &'static [(&'static str, &'static str)]);

#[rustfmt::skip]
const CORPUS: &[Group] = &[
    (
        "Categories",
        &[
            ("/category/uncategorized/feed/atom/", "index.php?category_name=$matches[1]&feed=$matches[2]"),
            ("/category/parent/child/feed/rss", "index.php?category_name=$matches[1]&feed=$matches[2]"),
            ("/category/uncategorized/atom/", "index.php?category_name=$matches[1]&feed=$matches[2]"),
            ("/category/parent/child/feed", "index.php?category_name=$matches[1]&feed=$matches[2]"),
            ("/category/uncategorized/page/345", "index.php?category_name=$matches[1]&paged=$matches[2]"),
            ("/category/parent/child/page2", "index.php?category_name=$matches[1]&paged=$matches[2]"),
            ("/category/uncategorized/", "index.php?category_name=$matches[1]"),
            ("/category/parent/child", "index.php?category_name=$matches[1]"),
        ],
    ),
    (
        "Tags",
        &[
            ("/tag/hello/feed/atom/", "index.php?tag=$matches[1]&feed=$matches[2]"),
            ("/tag/hello/feed/", "index.php?tag=$matches[1]&feed=$matches[2]"),
            ("/tag/hello/page/123", "index.php?tag=$matches[1]&paged=$matches[2]"),
            ("/tag/hello/", "index.php?tag=$matches[1]"),
        ],
    ),
    (
        "Post Type",
        &[
            ("/type/hello/feed/atom/", "index.php?post_format=$matches[1]&feed=$matches[2]"),
            ("/type/hello/feed/", "index.php?post_format=$matches[1]&feed=$matches[2]"),
            ("/type/hello/page/123", "index.php?post_format=$matches[1]&paged=$matches[2]"),
            ("/type/hello/", "index.php?post_format=$matches[1]"),
        ],
    ),
    (
        "Misc",
        &[
            ("/robots.txt", "index.php?robots=1"),
            ("/wp-rss.php", "index.php?feed=old"),
            ("/hello/wp-atom.php", "index.php?feed=old"),
            ("/wp-app.php/hello", "index.php?error=403"),
            ("/wp-register.php", "index.php?register=true"),
        ],
    ),
    (
        "Homepage",
        &[
            ("/feed/atom/", "index.php?&feed=$matches[1]"),
            ("/feed", "index.php?&feed=$matches[1]"),
            ("/page/2/", "index.php?&paged=$matches[1]"),
            ("/comments/feed/rss/", "index.php?&feed=$matches[1]&withcomments=1"),
            ("/comments/atom/", "index.php?&feed=$matches[1]&withcomments=1"),
        ],
    ),
    (
        "Search",
        &[
            ("/search/hello/feed/atom/", "index.php?s=$matches[1]&feed=$matches[2]"),
            ("/search/hello/world/feed/", "index.php?s=$matches[1]&feed=$matches[2]"),
            ("/search/hello/page/123", "index.php?s=$matches[1]&paged=$matches[2]"),
            ("/search/hello/", "index.php?s=$matches[1]"),
        ],
    ),
    (
        "Authors",
        &[
            ("/author/hello/feed/atom/", "index.php?author_name=$matches[1]&feed=$matches[2]"),
            ("/author/hello/feed/", "index.php?author_name=$matches[1]&feed=$matches[2]"),
            ("/author/hello/page/123", "index.php?author_name=$matches[1]&paged=$matches[2]"),
            ("/author/hello/", "index.php?author_name=$matches[1]"),
        ],
    ),
    (
        "Dates",
        &[
            ("/2014/1/1/feed/rss/", "index.php?year=$matches[1]&monthnum=$matches[2]&day=$matches[3]&feed=$matches[4]"),
            ("/2014/2/10/rss/", "index.php?year=$matches[1]&monthnum=$matches[2]&day=$matches[3]&feed=$matches[4]"),
            ("/2014/3/20/page/2/", "index.php?year=$matches[1]&monthnum=$matches[2]&day=$matches[3]&paged=$matches[4]"),
            ("/2014/4/30/", "index.php?year=$matches[1]&monthnum=$matches[2]&day=$matches[3]"),
            ("/2014/5/feed/rss/", "index.php?year=$matches[1]&monthnum=$matches[2]&feed=$matches[3]"),
            ("/2014/10/rss/", "index.php?year=$matches[1]&monthnum=$matches[2]&feed=$matches[3]"),
            ("/2014/11/page/123/", "index.php?year=$matches[1]&monthnum=$matches[2]&paged=$matches[3]"),
            ("/2014/12/", "index.php?year=$matches[1]&monthnum=$matches[2]"),
            ("/2014/feed/rss/", "index.php?year=$matches[1]&feed=$matches[2]"),
            ("/2014/rss/", "index.php?year=$matches[1]&feed=$matches[2]"),
            ("/2014/page/4567/", "index.php?year=$matches[1]&paged=$matches[2]"),
            ("/2014/", "index.php?year=$matches[1]"),
        ],
    ),
    (
        "Posts",
        &[
            ("/2014/1/1/hello/attachment/world/", "index.php?attachment=$matches[1]"),
            ("/2014/2/10/hello/attachment/world/trackback/", "index.php?attachment=$matches[1]&tb=1"),
            ("/2014/3/2/hello/attachment/world/feed/rss/", "index.php?attachment=$matches[1]&feed=$matches[2]"),
            ("/2014/4/20/hello/attachment/world/rss/", "index.php?attachment=$matches[1]&feed=$matches[2]"),
            ("/2014/5/30/hello/attachment/world/comment-page-2/", "index.php?attachment=$matches[1]&cpage=$matches[2]"),
            ("/2014/1/31/hello/trackback/", "index.php?year=$matches[1]&monthnum=$matches[2]&day=$matches[3]&name=$matches[4]&tb=1"),
            ("/2014/2/10/hello/feed/rss/", "index.php?year=$matches[1]&monthnum=$matches[2]&day=$matches[3]&name=$matches[4]&feed=$matches[5]"),
            ("/2014/3/20/hello/rss/", "index.php?year=$matches[1]&monthnum=$matches[2]&day=$matches[3]&name=$matches[4]&feed=$matches[5]"),
            ("/2014/4/30/hello/page/2/", "index.php?year=$matches[1]&monthnum=$matches[2]&day=$matches[3]&name=$matches[4]&paged=$matches[5]"),
            ("/2014/5/31/hello/comment-page-2/", "index.php?year=$matches[1]&monthnum=$matches[2]&day=$matches[3]&name=$matches[4]&cpage=$matches[5]"),
            ("/2014/10/5/hello/", "index.php?year=$matches[1]&monthnum=$matches[2]&day=$matches[3]&name=$matches[4]&page=$matches[5]"),
            ("/2014/10/5/hello/2", "index.php?year=$matches[1]&monthnum=$matches[2]&day=$matches[3]&name=$matches[4]&page=$matches[5]"),
            ("/2014/6/2/hello/world/", "index.php?attachment=$matches[1]"),
            ("/2014/7/10/hello/world/trackback/", "index.php?attachment=$matches[1]&tb=1"),
            ("/2014/10/20/hello/world/feed/rss/", "index.php?attachment=$matches[1]&feed=$matches[2]"),
            ("/2014/11/30/hello/world/rss/", "index.php?attachment=$matches[1]&feed=$matches[2]"),
            ("/2014/12/31/hello/world/comment-page-2/", "index.php?attachment=$matches[1]&cpage=$matches[2]"),
            ("/2014/12/comment-page-123/", "index.php?year=$matches[1]&monthnum=$matches[2]&cpage=$matches[3]"),
            ("/2014/comment-page-123/", "index.php?year=$matches[1]&cpage=$matches[2]"),
        ],
    ),
    (
        "Pages",
        &[
            ("/hello/attachment/world/", "index.php?attachment=$matches[1]"),
            ("/parent/child/attachment/world/", "index.php?attachment=$matches[1]"),
            ("/hello/attachment/world/trackback/", "index.php?attachment=$matches[1]&tb=1"),
            ("/parent/child/attachment/world/trackback/", "index.php?attachment=$matches[1]&tb=1"),
            ("/hello/attachment/world/feed/rss/", "index.php?attachment=$matches[1]&feed=$matches[2]"),
            ("/parent/child/attachment/world/feed/rss/", "index.php?attachment=$matches[1]&feed=$matches[2]"),
            ("/hello/attachment/world/feed/", "index.php?attachment=$matches[1]&feed=$matches[2]"),
            ("/parent/child/attachment/world/feed/", "index.php?attachment=$matches[1]&feed=$matches[2]"),
            ("/hello/attachment/world/comment-page-2/", "index.php?attachment=$matches[1]&cpage=$matches[2]"),
            ("/parent/child/attachment/world/comment-page-2/", "index.php?attachment=$matches[1]&cpage=$matches[2]"),
            ("/hello/trackback/", "index.php?pagename=$matches[1]&tb=1"),
            ("/parent/child/trackback/", "index.php?pagename=$matches[1]&tb=1"),
            ("/hello/feed/rss2/", "index.php?pagename=$matches[1]&feed=$matches[2]"),
            ("/parent/child/feed/rss2/", "index.php?pagename=$matches[1]&feed=$matches[2]"),
            ("/hello/feed/", "index.php?pagename=$matches[1]&feed=$matches[2]"),
            ("/parent/child/feed/", "index.php?pagename=$matches[1]&feed=$matches[2]"),
            ("/hello/page/2/", "index.php?pagename=$matches[1]&paged=$matches[2]"),
            ("/parent/child/page/2/", "index.php?pagename=$matches[1]&paged=$matches[2]"),
            ("/hello/comment-page-2/", "index.php?pagename=$matches[1]&cpage=$matches[2]"),
            ("/parent/child/comment-page-2/", "index.php?pagename=$matches[1]&cpage=$matches[2]"),
            ("/hello/", "index.php?pagename=$matches[1]&page=$matches[2]"),
            ("/hello/2", "index.php?pagename=$matches[1]&page=$matches[2]"),
            ("/parent/child/", "index.php?pagename=$matches[1]&page=$matches[2]"),
            ("/parent/child/2", "index.php?pagename=$matches[1]&page=$matches[2]"),
        ],
    ),
];

/// Cases the host is known to route differently from what they should.
///
/// `(group, path, expected rewrite)`. The day-level comment page is taken by
/// the post name rule first, so it never reaches its own rule. Kept out of
/// [`default_suite`] so a healthy site passes.
pub const KNOWN_DIVERGENT: &[(&str, &str, &str)] = &[(
    "Posts",
    "/2014/11/31/comment-page-123/",
    "index.php?year=$matches[1]&monthnum=$matches[2]&day=$matches[3]&cpage=$matches[4]",
)];

/// The built-in corpus as a suite
pub fn default_suite() -> TestSuite {
    let mut suite = TestSuite::new();
    for (group, cases) in CORPUS {
        let target = suite.group_mut(group);
        for (path, rewrite) in cases.iter() {
            target.insert(*path, Expectation::rewrite(*rewrite));
        }
    }
    suite
}
