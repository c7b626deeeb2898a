//! External collaborators the `csv_import` and `shelf_scan` drivers depend on but don't
//! implement themselves: an LLM for CSV parsing, an image-to-books scanner, and blob
//! storage for uploaded photos. Kept as trait objects so `shelfscribe_server` can wire
//! real HTTP-backed implementations while tests use stubs, the same split
//! `shelfscribe_providers::Provider` uses for metadata sources.

use async_trait::async_trait;
use serde::Deserialize;

/// One book candidate as parsed out of an uploaded CSV by the LLM provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ParsedBookCandidate {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub isbn: Option<String>,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Parse raw CSV bytes into book candidates. Implementations are responsible for
    /// their own prompt construction and response-shape validation; this trait only
    /// promises a `Vec` of candidates or an error string suitable for logging.
    async fn parse_books(&self, csv_body: &[u8]) -> Result<Vec<ParsedBookCandidate>, String>;
}

/// One book as recognized in a shelf photo, with the scanner's own confidence score.
#[derive(Debug, Clone)]
pub struct ScannedBook {
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub confidence: f64,
}

#[async_trait]
pub trait ImageScanner: Send + Sync {
    async fn scan(&self, image_bytes: &[u8]) -> Result<Vec<ScannedBook>, String>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), String>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, String>;
}
