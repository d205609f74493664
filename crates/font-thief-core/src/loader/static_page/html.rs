//! Stylesheet and font references in an HTML document.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<link\b([^>]*)>").expect("static regex"))
}

fn style_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<style\b[^>]*>(.*?)</style\s*>").expect("static regex"))
}

fn base_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<base\b([^>]*)>").expect("static regex"))
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)([a-z][a-z0-9_:-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
            .expect("static regex")
    })
}

/// Attribute map of a tag body, names lower-cased, common entities decoded.
fn attributes(tag_body: &str) -> HashMap<String, String> {
    attr_re()
        .captures_iter(tag_body)
        .filter_map(|c| {
            let name = c.get(1)?.as_str().to_ascii_lowercase();
            let value = c.get(2).or_else(|| c.get(3)).or_else(|| c.get(4))?.as_str();
            Some((name, decode_entities(value.trim())))
        })
        .collect()
}

fn decode_entities(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn has_token(value: Option<&String>, token: &str) -> bool {
    value.map_or(false, |v| v.split_whitespace().any(|t| t.eq_ignore_ascii_case(token)))
}

/// What a document points at.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DocumentRefs {
    /// `<base href>`, if any.
    pub base: Option<String>,
    /// `<link rel=stylesheet href>` targets.
    pub stylesheets: Vec<String>,
    /// `<link rel=preload as=font href>` targets.
    pub preloaded_fonts: Vec<String>,
    /// Contents of inline `<style>` blocks.
    pub inline_styles: Vec<String>,
}

pub fn scan_document(html: &str) -> DocumentRefs {
    let mut refs = DocumentRefs {
        base: base_re()
            .captures(html)
            .and_then(|c| attributes(c.get(1)?.as_str()).remove("href")),
        ..DocumentRefs::default()
    };

    for caps in link_re().captures_iter(html) {
        let Some(body) = caps.get(1) else {
            continue;
        };
        let attrs = attributes(body.as_str());
        let Some(href) = attrs.get("href").filter(|h| !h.is_empty()) else {
            continue;
        };
        let rel = attrs.get("rel");
        if has_token(rel, "stylesheet") {
            refs.stylesheets.push(href.clone());
        } else if has_token(rel, "preload") && has_token(attrs.get("as"), "font") {
            refs.preloaded_fonts.push(href.clone());
        }
    }

    refs.inline_styles = style_re()
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.trim().is_empty())
        .collect();
    refs
}
