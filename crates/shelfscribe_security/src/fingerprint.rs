//! Content fingerprints used as cache/coalescing keys.
//!
//! Mirrors `casparian_protocol::idempotency::hash_parts`: components are joined with
//! the ASCII Unit Separator (0x1f) before hashing so that `("ab", "c")` and `("a",
//! "bc")` never collide.

use sha2::{Digest, Sha256};

const SEP: u8 = 0x1f;

fn hash_parts(parts: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(&[SEP]);
    }
    hasher.finalize().to_hex().to_string()
}

/// Normalize a provider query (lower-cased, whitespace-collapsed, ordered) and hash it
/// into a stable fingerprint for `ProviderFanout`'s `Cache.Coalesce` key (§4.C).
pub fn fingerprint_query(title: &str, author: Option<&str>) -> String {
    let normalize = |s: &str| -> String { s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase() };
    let title_n = normalize(title);
    let author_n = author.map(normalize).unwrap_or_default();
    hash_parts(&[&title_n, &author_n])
}

/// SHA256 hex digest, used for the CSV-import LLM-coalescing key
/// (`sha256(prompt_version || csvBody)`, §4.G).
pub fn sha256_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_case_and_whitespace_insensitive() {
        let a = fingerprint_query("  The   Hobbit ", Some("J.R.R. Tolkien"));
        let b = fingerprint_query("the hobbit", Some("j.r.r. tolkien"));
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_distinguishes_component_boundaries() {
        let a = fingerprint_query("ab", Some("c"));
        let b = fingerprint_query("a", Some("bc"));
        assert_ne!(a, b);
    }

    #[test]
    fn sha256_is_stable() {
        let h1 = sha256_hex(&[b"v1", b"body"]);
        let h2 = sha256_hex(&[b"v1", b"body"]);
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }
}
