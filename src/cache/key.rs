//! Cache key generation using SHA-256 hashes

use sha2::{Digest, Sha256};

/// Generate a deterministic cache key from an operation name and its
/// parameters.
///
/// Parameters are sorted by name so call-site ordering never changes the key.
/// Each component is length-prefixed, so `("a", "b=c")` and `("a=b", "c")`
/// cannot collide.
pub fn cache_key(operation: &str, params: &[(&str, &str)]) -> String {
    let mut hasher = Sha256::new();

    hasher.update(operation.as_bytes());
    hasher.update(b"|");

    let mut sorted_params: Vec<_> = params.iter().collect();
    sorted_params.sort_by_key(|(k, _)| *k);

    for (k, v) in sorted_params {
        hasher.update((k.len() as u64).to_le_bytes());
        hasher.update(k.as_bytes());
        hasher.update((v.len() as u64).to_le_bytes());
        hasher.update(v.as_bytes());
    }

    format!("{:x}", hasher.finalize())
}
