//! An `LlmProvider` bound to a configurable external LLM endpoint over HTTP. The
//! endpoint is expected to accept a raw CSV body and return a JSON array of
//! `{title, author, isbn?}` candidates.

use async_trait::async_trait;
use shelfscribe_drivers::{LlmProvider, ParsedBookCandidate};

pub struct HttpLlmProvider {
    base_url: String,
    client: reqwest::Client,
}

impl HttpLlmProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl LlmProvider for HttpLlmProvider {
    async fn parse_books(&self, csv_body: &[u8]) -> Result<Vec<ParsedBookCandidate>, String> {
        let response = self
            .client
            .post(format!("{}/parse-csv", self.base_url))
            .header("content-type", "text/csv")
            .body(csv_body.to_vec())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("llm endpoint returned {}", response.status()));
        }

        response.json::<Vec<ParsedBookCandidate>>().await.map_err(|e| e.to_string())
    }
}
