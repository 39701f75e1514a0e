//! Content-derived identity used as the dedup key.

use sha2::{Digest, Sha256};

const DELIMITER: char = '|';

/// SHA-256 hex digest over the trimmed, lowercased (title, company, url) triple.
///
/// Depends only on its inputs, so the same triple yields the same key across
/// runs and processes.
pub fn fingerprint(title: &str, company_name: &str, source_url: &str) -> String {
    let payload = [title, company_name, source_url]
        .iter()
        .map(|part| part.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join(&DELIMITER.to_string());
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}
