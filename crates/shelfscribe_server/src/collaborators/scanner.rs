//! An `ImageScanner` bound to a configurable external image-to-books endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use shelfscribe_drivers::{ImageScanner, ScannedBook};

pub struct HttpImageScanner {
    base_url: String,
    client: reqwest::Client,
}

impl HttpImageScanner {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), client: reqwest::Client::new() }
    }
}

#[derive(Debug, Deserialize)]
struct ScannedBookDto {
    title: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    isbn: Option<String>,
    confidence: f64,
}

#[async_trait]
impl ImageScanner for HttpImageScanner {
    async fn scan(&self, image_bytes: &[u8]) -> Result<Vec<ScannedBook>, String> {
        let response = self
            .client
            .post(format!("{}/scan", self.base_url))
            .header("content-type", "application/octet-stream")
            .body(image_bytes.to_vec())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("scanner endpoint returned {}", response.status()));
        }

        let dtos: Vec<ScannedBookDto> = response.json().await.map_err(|e| e.to_string())?;
        Ok(dtos
            .into_iter()
            .map(|d| ScannedBook { title: d.title, author: d.author, isbn: d.isbn, confidence: d.confidence })
            .collect())
    }
}
