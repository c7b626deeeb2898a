//! End-to-end exercise of each pipeline driver against a real `Registry` +
//! `MemoryCheckpointStore`, with an in-memory stub in place of a real socket/provider.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use shelfscribe_drivers::batch_enrichment::BatchEnricher;
use shelfscribe_drivers::collaborators::{BlobStore, ImageScanner, ScannedBook};
use shelfscribe_drivers::shelf_scan::ShelfScanDriver;
use shelfscribe_drivers::validate::{validate_batch, validate_images, BookInput, ImageInput};
use shelfscribe_providers::{NormalizedWork, Provider, ProviderError, ProviderFanout, Work};
use shelfscribe_session::Registry;
use shelfscribe_session::socket::{InboundEvent, OutboundSocket, SocketError};
use shelfscribe_storage::MemoryCheckpointStore;

struct RecordingSocket {
    sent: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl OutboundSocket for RecordingSocket {
    async fn send_text(&mut self, text: String) -> Result<(), SocketError> {
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn close(&mut self, _code: u16, _reason: &str) {}
}

struct StubProvider;

#[async_trait]
impl Provider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn lookup(&self, title: &str, _author: Option<&str>) -> Result<NormalizedWork, ProviderError> {
        Ok(NormalizedWork {
            work: Work { title: title.to_string(), description: None },
            editions: vec![],
            authors: vec![],
        })
    }
}

#[tokio::test]
async fn batch_enrichment_completes_and_streams_progress() {
    let storage = Arc::new(MemoryCheckpointStore::new());
    let registry = Arc::new(Registry::new(storage, None));
    let session = registry.get("job-batch").await;

    let sent = Arc::new(Mutex::new(Vec::new()));
    session
        .attach_socket(Box::new(RecordingSocket { sent: sent.clone() }))
        .await
        .unwrap();

    let fanout = Arc::new(ProviderFanout::new(vec![Arc::new(StubProvider) as Arc<dyn Provider>], Duration::from_secs(1)));
    let enricher = Arc::new(BatchEnricher::new(fanout));

    let books = validate_batch(vec![BookInput { title: "Dune".into(), author: None, isbn: None }]).unwrap();
    enricher.run(session, books).await;

    let messages = sent.lock().unwrap();
    assert!(messages.iter().any(|m| m.contains("job_started")));
    assert!(messages.iter().any(|m| m.contains("job_complete")));
}

struct StubScanner;

#[async_trait]
impl ImageScanner for StubScanner {
    async fn scan(&self, _image_bytes: &[u8]) -> Result<Vec<ScannedBook>, String> {
        Ok(vec![ScannedBook { title: "Found Book".into(), author: None, isbn: None, confidence: 0.9 }])
    }
}

struct InMemoryBlob {
    objects: Mutex<std::collections::HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl BlobStore for InMemoryBlob {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), String> {
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, String> {
        self.objects.lock().unwrap().get(key).cloned().ok_or_else(|| "missing".to_string())
    }
}

#[tokio::test]
async fn shelf_scan_dedupes_and_completes() {
    let storage = Arc::new(MemoryCheckpointStore::new());
    let registry = Arc::new(Registry::new(storage, None));
    let session = registry.get("job-scan").await;

    let sent = Arc::new(Mutex::new(Vec::new()));
    session
        .attach_socket(Box::new(RecordingSocket { sent: sent.clone() }))
        .await
        .unwrap();

    let blob = Arc::new(InMemoryBlob { objects: Mutex::new(std::collections::HashMap::new()) });
    let scanner = Arc::new(StubScanner);
    let driver = Arc::new(ShelfScanDriver::new(blob, scanner));

    let image_data = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b"fake-jpeg-bytes");
    let images = vec![ImageInput { index: 0, data: image_data }];
    validate_images(&images).unwrap();

    driver.run(session, "job-scan".to_string(), images).await;

    let messages = sent.lock().unwrap();
    assert!(messages.iter().any(|m| m.contains("batch-complete")));
}
