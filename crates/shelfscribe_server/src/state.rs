//! Process-wide shared state the HTTP handlers delegate to. Everything here is
//! `Arc`-shared and safe to clone cheaply per request (§5 "Shared-resource policy").

use std::sync::Arc;

use shelfscribe_drivers::batch_enrichment::BatchEnricher;
use shelfscribe_drivers::csv_import::CsvImportHandler;
use shelfscribe_drivers::shelf_scan::ShelfScanDriver;
use shelfscribe_ratelimit::RateLimiter;
use shelfscribe_session::Registry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub rate_limiter: Arc<RateLimiter>,
    pub batch_enricher: Arc<BatchEnricher>,
    pub csv_handler: Arc<CsvImportHandler>,
    pub shelf_scan: Arc<ShelfScanDriver>,
}
