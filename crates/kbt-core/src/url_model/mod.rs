//! Filename derivation for retrieved resources.
//!
//! The server names the file through its `Content-Disposition` header; when
//! that is missing or unusable a name is synthesized from the resource id.
//! Every result is sanitized before it reaches the sink.

mod content_disposition;
mod sanitize;

pub use content_disposition::parse_content_disposition_filename;
pub use sanitize::sanitize_filename;

use crate::task::ResourceId;

/// Prefix for names synthesized from the resource id.
const FALLBACK_PREFIX: &str = "document-";

/// Derives a safe local filename for a retrieved resource.
///
/// Prefers the filename from `content_disposition` (`filename*` before
/// `filename`), otherwise `document-<resource_id>`.
///
/// # Examples
///
/// - `derive_filename(&42.into(), Some("attachment; filename=\"report.pdf\""))` → `"report.pdf"`
/// - `derive_filename(&42.into(), None)` → `"document-42"`
pub fn derive_filename(resource_id: &ResourceId, content_disposition: Option<&str>) -> String {
    let from_header = content_disposition
        .and_then(parse_content_disposition_filename)
        .map(|raw| sanitize_filename(&raw))
        .filter(|s| !s.is_empty() && s != "." && s != "..");

    match from_header {
        Some(name) => name,
        None => {
            let synthesized = sanitize_filename(&format!("{}{}", FALLBACK_PREFIX, resource_id));
            if synthesized.is_empty() {
                FALLBACK_PREFIX.trim_end_matches('-').to_string()
            } else {
                synthesized
            }
        }
    }
}
