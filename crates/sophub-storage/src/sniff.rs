//! Content type detection for stored objects.

use sophub_entity::document::DocumentKind;

/// Content types that say nothing about the payload.
const GENERIC_TYPES: &[&str] = &["application/octet-stream", "binary/octet-stream"];

/// Content type to judge an object by: the store-reported one when it is
/// specific, otherwise one sniffed from the leading bytes.
pub fn effective_content_type(reported: Option<&str>, data: &[u8]) -> Option<String> {
    let reported = reported
        .map(|ct| ct.trim())
        .filter(|ct| !ct.is_empty())
        .filter(|ct| {
            let essence = ct.split(';').next().unwrap_or_default().trim();
            !GENERIC_TYPES.iter().any(|g| essence.eq_ignore_ascii_case(g))
        });
    match reported {
        Some(ct) => Some(ct.to_string()),
        None => DocumentKind::sniff(data).map(|kind| kind.mime_type().to_string()),
    }
}
