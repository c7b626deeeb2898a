//! Shelfscribe server: binds the HTTP + WebSocket surface to a `Registry` of
//! per-job Sessions and the three pipeline drivers.
//!
//! Usage:
//!     shelfscribe-server --bind 0.0.0.0 --port 8080

mod collaborators;
mod config;
mod error;
mod middleware;
mod routes;
mod socket;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use shelfscribe_drivers::batch_enrichment::BatchEnricher;
use shelfscribe_drivers::csv_import::{CsvImportHandler, RegistryBoundHandler};
use shelfscribe_drivers::shelf_scan::ShelfScanDriver;
use shelfscribe_logging::LogConfig;
use shelfscribe_providers::{Provider, ProviderFanout};
use shelfscribe_ratelimit::RateLimiter;
use shelfscribe_session::Registry;
use shelfscribe_storage::{CheckpointStore, MemoryCheckpointStore};

use collaborators::{HttpCatalogProvider, HttpImageScanner, HttpLlmProvider, InMemoryBlobStore};
use config::ShelfscribeConfig;
use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "shelfscribe-server", about = "Shelfscribe job-orchestration server")]
struct Args {
    /// Bind address, overrides config.toml and SHELFSCRIBE_BIND_ADDR
    #[arg(long)]
    bind: Option<String>,

    /// Port, overrides config.toml and SHELFSCRIBE_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Path to config.toml; defaults to ~/.shelfscribe/config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    shelfscribe_logging::init_logging(LogConfig {
        app_name: "shelfscribe_server",
        verbose: args.verbose,
        quiet_console: false,
    })?;

    let config_path = args.config.unwrap_or_else(ShelfscribeConfig::default_path);
    let mut config = ShelfscribeConfig::load(Some(&config_path));
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    tracing::info!(bind = %config.bind_addr, port = config.port, "starting shelfscribe server");

    let storage: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::new());

    let llm: Arc<dyn shelfscribe_drivers::LlmProvider> = match &config.llm_endpoint {
        Some(endpoint) => Arc::new(HttpLlmProvider::new(endpoint.clone())),
        None => {
            tracing::warn!("no llm endpoint configured, csv_import will fail every job");
            Arc::new(UnconfiguredLlmProvider)
        }
    };
    let csv_handler = Arc::new(CsvImportHandler::new(storage.clone(), llm));

    let registry = Arc::new_cyclic(|weak: &std::sync::Weak<Registry>| {
        let alarm_handler = Arc::new(RegistryBoundHandler::new(csv_handler.clone(), weak.clone()));
        Registry::new(storage.clone(), Some(alarm_handler))
    });

    let providers: Vec<Arc<dyn Provider>> = match &config.catalog_endpoint {
        Some(endpoint) => vec![Arc::new(HttpCatalogProvider::new("catalog", endpoint.clone()))],
        None => {
            tracing::warn!("no catalog endpoint configured, batch_enrichment will find nothing");
            Vec::new()
        }
    };
    let fanout = Arc::new(ProviderFanout::new(providers, config.provider_timeout));
    let batch_enricher = Arc::new(BatchEnricher::new(fanout));

    let scanner: Arc<dyn shelfscribe_drivers::ImageScanner> = match &config.scanner_endpoint {
        Some(endpoint) => Arc::new(HttpImageScanner::new(endpoint.clone())),
        None => {
            tracing::warn!("no scanner endpoint configured, shelf_scan will find nothing");
            Arc::new(UnconfiguredImageScanner)
        }
    };
    let blob_store = Arc::new(InMemoryBlobStore::new());
    let shelf_scan = Arc::new(ShelfScanDriver::new(blob_store, scanner));

    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_max_requests, config.rate_limit_window));

    let state = AppState {
        registry,
        rate_limiter,
        batch_enricher,
        csv_handler,
        shelf_scan,
    };

    let app = routes::router(state);
    let addr: SocketAddr = format!("{}:{}", config.bind_addr, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

struct UnconfiguredLlmProvider;

#[async_trait::async_trait]
impl shelfscribe_drivers::LlmProvider for UnconfiguredLlmProvider {
    async fn parse_books(&self, _csv_body: &[u8]) -> Result<Vec<shelfscribe_drivers::ParsedBookCandidate>, String> {
        Err("no llm endpoint configured".into())
    }
}

struct UnconfiguredImageScanner;

#[async_trait::async_trait]
impl shelfscribe_drivers::ImageScanner for UnconfiguredImageScanner {
    async fn scan(&self, _image_bytes: &[u8]) -> Result<Vec<shelfscribe_drivers::ScannedBook>, String> {
        Err("no scanner endpoint configured".into())
    }
}
