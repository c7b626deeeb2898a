//! Shelfscribe Security Module
//!
//! Provides:
//! - **Token minting**: 128-bit opaque random auth token values
//! - **Fingerprinting**: stable BLAKE3 fingerprints for cache keys and coalescing
//! - **Content hashing**: SHA256 for the CSV-parse cache key

pub mod fingerprint;
pub mod token;

pub use fingerprint::{fingerprint_query, sha256_hex};
pub use token::new_auth_token_value;
