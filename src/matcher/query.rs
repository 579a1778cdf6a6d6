//! Query string helpers
//!
//! Rewrite targets are query strings with `$matches[N]` placeholders. These
//! helpers substitute captures into them and parse the result the way the
//! host's request parser does.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::QueryVars;

/// Form encoding: everything but alphanumerics and `-_.` is escaped
const FORM_ENCODE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

const PLACEHOLDER: &str = "$matches[";

/// Form-encode a value; spaces become `+`
pub fn urlencode(value: &str) -> String {
    utf8_percent_encode(value, FORM_ENCODE)
        .to_string()
        .replace("%20", "+")
}

/// Form-decode a value; `+` becomes a space
pub fn urldecode(value: &str) -> String {
    let spaced = value.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Drop everything up to the last `?` of a rewrite target.
///
/// A leading `?` with nothing before it is kept.
pub fn strip_to_query(rewrite: &str) -> &str {
    match rewrite.rfind('?') {
        Some(idx) if idx > 0 => &rewrite[idx + 1..],
        _ => rewrite,
    }
}

/// Replace `$matches[N]` (N >= 1) with the form-encoded capture N.
///
/// Groups that did not participate, or do not exist, substitute as empty.
/// `$matches[0]` and malformed placeholders are left alone.
pub fn substitute_matches(template: &str, groups: &[Option<String>]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(PLACEHOLDER) {
        out.push_str(&rest[..start]);
        let after = &rest[start + PLACEHOLDER.len()..];

        match placeholder_digits(after) {
            Some(digits) if !after.starts_with('0') => {
                let value = after[..digits]
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| groups.get(index))
                    .and_then(|group| group.as_deref());
                if let Some(value) = value {
                    out.push_str(&urlencode(value));
                }
                rest = &after[digits + 1..];
            }
            _ => {
                out.push_str(PLACEHOLDER);
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Index N of the first `var=$matches[N]` in a rewrite target
pub fn placeholder_index(template: &str, var: &str) -> Option<usize> {
    let needle = format!("{}={}", var, PLACEHOLDER);
    let mut search = template;

    while let Some(pos) = search.find(&needle) {
        let after = &search[pos + needle.len()..];
        if let Some(digits) = placeholder_digits(after) {
            return after[..digits].parse().ok();
        }
        search = after;
    }

    None
}

/// Length of the `123` in `123]...`, if the digits are closed by `]`
fn placeholder_digits(after: &str) -> Option<usize> {
    let digits = after.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && after[digits..].starts_with(']') {
        Some(digits)
    } else {
        None
    }
}

/// Parse a query string into variables.
///
/// Keys and values are form-decoded, spaces and dots in keys become
/// underscores and a repeated key keeps its last value.
pub fn parse_query(query: &str) -> QueryVars {
    let mut vars = QueryVars::new();

    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = urldecode(key)
            .trim_start()
            .replace([' ', '.'], "_");
        if key.is_empty() {
            continue;
        }
        vars.insert(key, urldecode(value));
    }

    vars
}
