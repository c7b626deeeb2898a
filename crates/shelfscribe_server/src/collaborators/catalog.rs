//! A `Provider` bound to a configurable external metadata catalog over HTTP.
//!
//! The spec treats the actual catalog vendor as a true external collaborator (§6
//! "LLM/provider adapters remain true externals"); this is the generic HTTP binding
//! every concrete catalog sits behind, the same shape as `AzureProvider`'s
//! `reqwest::Client` + base-URL pattern.

use async_trait::async_trait;
use serde::Deserialize;
use shelfscribe_providers::{NormalizedWork, Provider, ProviderError};

pub struct HttpCatalogProvider {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

impl HttpCatalogProvider {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(flatten)]
    work: NormalizedWork,
}

#[async_trait]
impl Provider for HttpCatalogProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, title: &str, author: Option<&str>) -> Result<NormalizedWork, ProviderError> {
        let response = self
            .client
            .get(format!("{}/lookup", self.base_url))
            .query(&[("title", title), ("author", author.unwrap_or(""))])
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Request(format!("catalog returned {}", response.status())));
        }

        response
            .json::<CatalogResponse>()
            .await
            .map(|r| r.work)
            .map_err(|e| ProviderError::Request(e.to_string()))
    }
}
