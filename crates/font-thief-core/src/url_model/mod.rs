//! Font file names and run directory slugs derived from URLs.

mod path;
mod sanitize;
mod slug;

pub use path::filename_from_url_path;
pub use sanitize::sanitize_filename;
pub use slug::slugify;

/// Name used when a URL yields nothing usable.
pub const DEFAULT_FONT_NAME: &str = "font";

/// Derives a safe local name for a font URL: the sanitized last path
/// segment, or [`DEFAULT_FONT_NAME`].
///
/// - `https://example.com/a/Inter.woff2?v=4` → `Inter.woff2`
/// - `https://example.com/` → `font`
pub fn derive_font_name(url: &str) -> String {
    let sanitized = filename_from_url_path(url)
        .map(|raw| sanitize_filename(&raw))
        .unwrap_or_default();
    if sanitized.is_empty() {
        DEFAULT_FONT_NAME.to_string()
    } else {
        sanitized
    }
}

/// Lower-case extension of `name` without the dot, if any.
pub fn extension_of(name: &str) -> Option<String> {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_ascii_lowercase())
}

/// `name` with `-<n>` inserted before the extension (`a.woff2`, 2 → `a-2.woff2`).
pub fn numbered_name(name: &str, n: usize) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}-{}{}", &name[..dot], n, &name[dot..]),
        _ => format!("{}-{}", name, n),
    }
}
