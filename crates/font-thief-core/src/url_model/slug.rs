//! URL slugs for run directory names.

/// Lower-case, URL-safe slug: ASCII alphanumeric runs joined by single `-`.
///
/// `https://Example.com/fonts?page=2` → `https-example-com-fonts-page-2`
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}
