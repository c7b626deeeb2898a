//! The `csv_import` pipeline (§4.G): accept an uploaded file synchronously, then do the
//! actual LLM-backed parsing from a delayed alarm so the client has time to open its
//! WebSocket before the first progress message goes out.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use shelfscribe_cache::{Cache, Coalescer};
use shelfscribe_protocol::{ErrorCode, Pipeline, CSV_PARSE_ALARM_DELAY, CSV_PARSE_CACHE_TTL, CSV_READY_GRACE};
use shelfscribe_security::fingerprint::sha256_hex;
use shelfscribe_session::{AlarmHandler, Registry, SessionHandle};
use shelfscribe_storage::CheckpointStore;

use crate::collaborators::{LlmProvider, ParsedBookCandidate};
use crate::error::DriverError;
use crate::fault::fail_job;

const PROMPT_VERSION: &str = "csv-import-v1";

/// Entry point the HTTP handler calls synchronously: persist the body, arm the
/// parse alarm, return. The actual work happens in `RegistryBoundHandler::handle_alarm`.
pub async fn accept(session: &SessionHandle, csv_body: Vec<u8>) -> Result<(), DriverError> {
    session.init_csv_import(csv_body).await?;
    session.schedule_delayed(Value::Null, CSV_PARSE_ALARM_DELAY).await?;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ParsedBookDto {
    title: String,
    author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    isbn: Option<String>,
}

#[derive(Debug, Clone)]
enum CsvOutcome {
    Parsed(Vec<ParsedBookCandidate>),
    Failed(String),
}

/// The `AlarmHandler` the `Registry` invokes once the 2s csv-parse alarm fires for a
/// `csv_import` Session.
pub struct CsvImportHandler {
    storage: Arc<dyn CheckpointStore>,
    llm: Arc<dyn LlmProvider>,
    cache: Cache<Arc<CsvOutcome>>,
    coalescer: Coalescer<CsvOutcome, String>,
}

impl CsvImportHandler {
    pub fn new(storage: Arc<dyn CheckpointStore>, llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            storage,
            llm,
            cache: Cache::new(),
            coalescer: Coalescer::new(),
        }
    }

    async fn process(&self, registry: &Registry, job_id: &str) {
        let session = registry.get(job_id).await;
        if let Err(err) = self.process_inner(&session, job_id).await {
            fail_job(&session, Pipeline::CsvImport, ErrorCode::ECsvProcessingFailed, &err.to_string()).await;
        }
    }

    async fn process_inner(&self, session: &SessionHandle, job_id: &str) -> Result<(), DriverError> {
        // Non-fatal: the client may not have opened its socket yet. Either way we
        // proceed, so early progress envelopes just queue until a socket attaches.
        let _ = session.wait_for_ready(CSV_READY_GRACE).await;

        session.send_progress(json!({ "progress": 0.1, "status": "validating" }), false).await?;
        let checkpoint = self
            .storage
            .load(job_id)
            .await
            .map_err(|e| DriverError::External(e.to_string()))?;
        let csv_body = checkpoint.csv_data.ok_or_else(|| DriverError::External("no csv body persisted".into()))?;

        session.send_progress(json!({ "progress": 0.3, "status": "uploaded" }), false).await?;

        let key = sha256_hex(&[PROMPT_VERSION.as_bytes(), &csv_body]);
        let now = chrono::Utc::now();
        let outcome = if let Some(Some(cached)) = self.cache.get(&key, now) {
            cached
        } else {
            let llm = self.llm.clone();
            let body = csv_body.clone();
            let result = self
                .coalescer
                .get_or_produce(&key, || async move {
                    Ok::<_, String>(match llm.parse_books(&body).await {
                        Ok(candidates) if !candidates.is_empty() => CsvOutcome::Parsed(candidates),
                        Ok(_) => CsvOutcome::Failed("llm returned zero candidates".into()),
                        Err(e) => CsvOutcome::Failed(e),
                    })
                })
                .await;
            let outcome = match result.as_ref() {
                Ok(outcome) => Arc::new(outcome.clone()),
                Err(_) => Arc::new(CsvOutcome::Failed("csv parse coalescing producer failed".into())),
            };
            if matches!(outcome.as_ref(), CsvOutcome::Parsed(_)) {
                self.cache.put_ok(key, outcome.clone(), CSV_PARSE_CACHE_TTL, now);
            }
            outcome
        };

        session.send_progress(json!({ "progress": 0.8, "status": "parsing" }), false).await?;

        let candidates = match outcome.as_ref() {
            CsvOutcome::Parsed(candidates) => candidates.clone(),
            CsvOutcome::Failed(reason) => return Err(DriverError::External(reason.clone())),
        };

        let mut books = Vec::new();
        let mut errors = Vec::new();
        for candidate in &candidates {
            let title = candidate.title.trim().to_string();
            let author = candidate.author.trim().to_string();
            if title.is_empty() || author.is_empty() {
                errors.push(json!({ "title": candidate.title, "error": "missing title or author" }));
                continue;
            }
            books.push(ParsedBookDto {
                title,
                author,
                isbn: candidate.isbn.as_ref().map(|i| i.trim().to_string()).filter(|i| !i.is_empty()),
            });
        }

        let success_rate = format!("{}/{}", books.len(), candidates.len().max(1));
        let payload = json!({ "books": books, "errors": errors, "successRate": success_rate });
        session.complete_job_state(payload.clone()).await?;
        session.send_complete(payload).await?;
        Ok(())
    }
}

/// Binds a `CsvImportHandler` to the `Registry` it needs to resolve a `SessionHandle`
/// from a bare `jobId`. The `Registry` itself holds this handler as its `AlarmHandler`,
/// so the reference back is a `Weak` to avoid a reference cycle — built with
/// `Arc::new_cyclic` in `shelfscribe_server`'s wiring.
pub struct RegistryBoundHandler {
    inner: Arc<CsvImportHandler>,
    registry: Weak<Registry>,
}

impl RegistryBoundHandler {
    pub fn new(inner: Arc<CsvImportHandler>, registry: Weak<Registry>) -> Self {
        Self { inner, registry }
    }
}

#[async_trait]
impl AlarmHandler for RegistryBoundHandler {
    async fn handle_alarm(&self, job_id: &str, _payload: Value) {
        let Some(registry) = self.registry.upgrade() else {
            tracing::warn!(job_id, "registry gone before csv-import alarm could dispatch");
            return;
        };
        self.inner.process(&registry, job_id).await;
    }
}
