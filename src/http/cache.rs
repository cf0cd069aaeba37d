//! HTTP cache control for stored uploads
//!
//! Upload names are generated once and never reused, so a stored file's
//! bytes never change under its URL. Responses are marked immutable and
//! carry a content `ETag` for conditional requests.

use sha2::{Digest, Sha256};

/// `Cache-Control` value for uploaded files
pub const IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Quoted strong `ETag` from the content length and its SHA-256 digest
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("\"{:x}-{:x}\"", content.len(), hasher.finalize())
}

/// `If-None-Match` uses weak comparison: a `W/` prefix on either side is ignored
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    let ours = etag.trim_start_matches("W/");
    if_none_match.is_some_and(|client_etag| {
        client_etag.split(',').map(str::trim).any(|candidate| {
            candidate == "*" || candidate.trim_start_matches("W/") == ours
        })
    })
}
