//! Font references in stylesheets.

use regex::Regex;
use std::sync::OnceLock;

fn import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)@import\s+(?:url\(\s*)?["']?([^"')\s;]+)"#).expect("static regex")
    })
}

/// CSS with `/* ... */` comments removed.
fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Raw `url(...)` values in `block`, unquoted, without `data:` URIs.
fn url_values(block: &str) -> Vec<String> {
    let lower = block.to_ascii_lowercase();
    let mut out = Vec::new();
    let mut search_from = 0usize;
    while let Some(idx) = lower[search_from..].find("url(") {
        let start = search_from + idx + 4;
        let Some(end) = block[start..].find(')') else {
            break;
        };
        let raw = block[start..start + end].trim().trim_matches('"').trim_matches('\'').trim();
        if !raw.is_empty() && !raw.to_ascii_lowercase().starts_with("data:") {
            out.push(raw.to_string());
        }
        search_from = start + end + 1;
    }
    out
}

/// Every font URL named by an `@font-face` rule, in source order.
/// Values are returned as written (possibly relative).
pub fn font_face_urls(css: &str) -> Vec<String> {
    let css = strip_comments(css);
    let lower = css.to_ascii_lowercase();
    let mut out = Vec::new();
    let mut search_from = 0usize;

    while let Some(idx) = lower[search_from..].find("@font-face") {
        let start = search_from + idx;
        let Some(open) = css[start..].find('{') else {
            break;
        };
        let block_start = start + open + 1;
        let Some(close) = css[block_start..].find('}') else {
            break;
        };
        let block_end = block_start + close;
        out.extend(url_values(&css[block_start..block_end]));
        search_from = block_end + 1;
    }
    out
}

/// Targets of `@import` rules, as written.
pub fn import_urls(css: &str) -> Vec<String> {
    let css = strip_comments(css);
    import_re()
        .captures_iter(&css)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
