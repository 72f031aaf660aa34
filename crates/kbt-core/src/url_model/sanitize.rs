//! Filesystem-safe filename sanitization.

/// Longest filename kept, in bytes (Linux NAME_MAX).
const NAME_MAX: usize = 255;

/// Sanitizes a candidate filename before it is written to disk.
///
/// - Replaces path separators, NUL, control characters and the characters
///   Windows forbids (`<>:"|?*`) with `_`
/// - Collapses consecutive underscores
/// - Trims leading/trailing spaces, dots and underscores
/// - Limits length to 255 bytes on a char boundary
///
/// Interior spaces are kept: document titles usually have them.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let forbidden = c.is_control()
            || matches!(c, '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*');
        let c = if forbidden { '_' } else { c };

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

    let trimmed = out.trim_matches(|c: char| c == ' ' || c == '.' || c == '_');

    let mut take = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}
