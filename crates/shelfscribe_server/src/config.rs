//! Layered config resolution: compiled-in defaults, overridable by an optional
//! `config.toml`, overridable again by `SHELFSCRIBE_*` env vars.
//!
//! No config-merge crate: like the teacher's `casparian/src/cli/config.rs`, this is a
//! handful of explicit `if let Ok(...)` overrides, not a generic layered-config library.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use shelfscribe_protocol::{
    ENRICH_CONCURRENCY, PROVIDER_TIMEOUT, RATE_LIMIT_MAX_REQUESTS, RATE_LIMIT_WINDOW,
};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    bind_addr: Option<String>,
    port: Option<u16>,
    rate_limit_max_requests: Option<u32>,
    rate_limit_window_secs: Option<u64>,
    provider_timeout_secs: Option<u64>,
    enrich_concurrency: Option<usize>,
    catalog_endpoint: Option<String>,
    llm_endpoint: Option<String>,
    scanner_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ShelfscribeConfig {
    pub bind_addr: String,
    pub port: u16,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window: Duration,
    pub provider_timeout: Duration,
    pub enrich_concurrency: usize,
    /// Base URL of an external metadata catalog. Unset means "no external providers",
    /// which still functions (`ProviderFanout` treats zero providers as always
    /// `NoResults`), just without real lookups.
    pub catalog_endpoint: Option<String>,
    /// Base URL of an external LLM endpoint used to parse uploaded CSV bodies.
    pub llm_endpoint: Option<String>,
    /// Base URL of an external image-to-books scanning endpoint.
    pub scanner_endpoint: Option<String>,
}

impl Default for ShelfscribeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            rate_limit_max_requests: RATE_LIMIT_MAX_REQUESTS,
            rate_limit_window: RATE_LIMIT_WINDOW,
            provider_timeout: PROVIDER_TIMEOUT,
            enrich_concurrency: ENRICH_CONCURRENCY,
            catalog_endpoint: None,
            llm_endpoint: None,
            scanner_endpoint: None,
        }
    }
}

impl ShelfscribeConfig {
    /// Resolve from `config_path` (if it exists) layered under defaults, then apply
    /// `SHELFSCRIBE_*` env overrides on top.
    pub fn load(config_path: Option<&PathBuf>) -> Self {
        let mut config = Self::default();

        if let Some(path) = config_path {
            if let Ok(contents) = std::fs::read_to_string(path) {
                match toml::from_str::<FileConfig>(&contents) {
                    Ok(file) => config.apply_file(file),
                    Err(err) => tracing::warn!(path = %path.display(), %err, "failed to parse config file, ignoring"),
                }
            }
        }

        config.apply_env();
        config
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.bind_addr {
            self.bind_addr = v;
        }
        if let Some(v) = file.port {
            self.port = v;
        }
        if let Some(v) = file.rate_limit_max_requests {
            self.rate_limit_max_requests = v;
        }
        if let Some(v) = file.rate_limit_window_secs {
            self.rate_limit_window = Duration::from_secs(v);
        }
        if let Some(v) = file.provider_timeout_secs {
            self.provider_timeout = Duration::from_secs(v);
        }
        if let Some(v) = file.enrich_concurrency {
            self.enrich_concurrency = v;
        }
        self.catalog_endpoint = file.catalog_endpoint.or(self.catalog_endpoint.take());
        self.llm_endpoint = file.llm_endpoint.or(self.llm_endpoint.take());
        self.scanner_endpoint = file.scanner_endpoint.or(self.scanner_endpoint.take());
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("SHELFSCRIBE_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Ok(v) = std::env::var("SHELFSCRIBE_PORT") {
            if let Ok(v) = v.parse() {
                self.port = v;
            }
        }
        if let Ok(v) = std::env::var("SHELFSCRIBE_RATE_LIMIT_MAX_REQUESTS") {
            if let Ok(v) = v.parse() {
                self.rate_limit_max_requests = v;
            }
        }
        if let Ok(v) = std::env::var("SHELFSCRIBE_RATE_LIMIT_WINDOW_SECS") {
            if let Ok(v) = v.parse::<u64>() {
                self.rate_limit_window = Duration::from_secs(v);
            }
        }
        if let Ok(v) = std::env::var("SHELFSCRIBE_PROVIDER_TIMEOUT_SECS") {
            if let Ok(v) = v.parse::<u64>() {
                self.provider_timeout = Duration::from_secs(v);
            }
        }
        if let Ok(v) = std::env::var("SHELFSCRIBE_ENRICH_CONCURRENCY") {
            if let Ok(v) = v.parse() {
                self.enrich_concurrency = v;
            }
        }
        if let Ok(v) = std::env::var("SHELFSCRIBE_CATALOG_ENDPOINT") {
            self.catalog_endpoint = Some(v);
        }
        if let Ok(v) = std::env::var("SHELFSCRIBE_LLM_ENDPOINT") {
            self.llm_endpoint = Some(v);
        }
        if let Ok(v) = std::env::var("SHELFSCRIBE_SCANNER_ENDPOINT") {
            self.scanner_endpoint = Some(v);
        }
    }

    /// Home directory used for the default config file path: `~/.shelfscribe/config.toml`.
    pub fn default_path() -> PathBuf {
        shelfscribe_logging::shelfscribe_home().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let config = ShelfscribeConfig::default();
        assert_eq!(config.rate_limit_max_requests, RATE_LIMIT_MAX_REQUESTS);
        assert_eq!(config.enrich_concurrency, ENRICH_CONCURRENCY);
    }
}
