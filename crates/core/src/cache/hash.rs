//! Request identity keys for cached responses.

use sha2::{Digest, Sha256};

/// Compute the key a request is stored under inside one cache generation.
///
/// Identity is method plus URL; callers pass the URL with its fragment removed.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
