//! Filesystem-safe file names.

/// Sanitizes a candidate file name.
///
/// - Replaces NUL, `/`, `\`, control characters and characters Windows
///   refuses (`<>:"|?*`) with `_`; whitespace becomes `_` as well
/// - Collapses runs of `_` and trims leading/trailing dots and underscores
/// - Limits length to 255 bytes (Linux NAME_MAX), keeping the extension
pub fn sanitize_filename(name: &str) -> String {
    const NAME_MAX: usize = 255;

    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let unsafe_char = c == '\0'
            || c == '/'
            || c == '\\'
            || c.is_control()
            || c.is_whitespace()
            || matches!(c, '<' | '>' | ':' | '"' | '|' | '?' | '*');
        let c = if unsafe_char { '_' } else { c };
        if c == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    if trimmed.len() <= NAME_MAX {
        return trimmed.to_string();
    }

    // Too long: shorten the stem and keep a short extension intact.
    let (stem, ext) = match trimmed.rfind('.') {
        Some(dot) if trimmed.len() - dot <= 16 => trimmed.split_at(dot),
        _ => (trimmed, ""),
    };
    let mut take = NAME_MAX - ext.len();
    while take > 0 && !stem.is_char_boundary(take) {
        take -= 1;
    }
    format!("{}{}", &stem[..take], ext)
}
