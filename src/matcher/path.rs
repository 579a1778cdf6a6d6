//! Request path normalization
//!
//! Test paths are written the way a visitor would type them
//! (`/category/news/`, sometimes a full URL). Rules are matched against the
//! path relative to the site root, without its leading slash.

/// Reduce a test path to the string rewrite rules are matched against.
///
/// Drops scheme and host, query and fragment, the site's subdirectory
/// (`home_path`, e.g. `/blog`) and finally the leading slash.
pub fn normalize_path(path: &str, home_path: Option<&str>) -> String {
    let mut rest = strip_authority(path);

    if let Some(end) = rest.find(['?', '#']) {
        rest = &rest[..end];
    }

    if let Some(home) = home_path.map(|h| h.trim_end_matches('/')).filter(|h| !h.is_empty()) {
        if let Some(stripped) = rest.strip_prefix(home) {
            if stripped.is_empty() || stripped.starts_with('/') {
                rest = stripped;
            }
        }
    }

    rest.trim_start_matches('/').to_string()
}

/// Query string part of a test path, if any
pub fn query_part(path: &str) -> Option<&str> {
    let (_, query) = path.split_once('?')?;
    let query = query.split('#').next().unwrap_or("");
    if query.is_empty() {
        None
    } else {
        Some(query)
    }
}

fn strip_authority(path: &str) -> &str {
    let after_scheme = match path.split_once("://") {
        Some((scheme, rest)) if !scheme.contains('/') => rest,
        _ => match path.strip_prefix("//") {
            Some(rest) => rest,
            None => return path,
        },
    };
    after_scheme
        .find('/')
        .map(|idx| &after_scheme[idx..])
        .unwrap_or("")
}
