//! Auth token value generation (§3 AuthToken: "128-bit opaque random").
//!
//! Rendered as a UUID v4 string (36 chars incl. hyphens) to match the published
//! response shape (`S1`: "`data.token` is a 36-char UUID").

use uuid::Uuid;

/// Mint a fresh, uniformly random auth token value, distinct from any prior value
/// with overwhelming probability (§8 invariant 5).
pub fn new_auth_token_value() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_36_chars_and_distinct() {
        let a = new_auth_token_value();
        let b = new_auth_token_value();
        assert_eq!(a.len(), 36);
        assert_ne!(a, b);
    }
}
