//! The `batch_enrichment` pipeline (§4.G): look up metadata for a list of
//! `{title, author?, isbn?}` entries and stream progress over the job's socket.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::json;
use shelfscribe_cache::Cache;
use shelfscribe_protocol::{ErrorCode, Pipeline, ENRICH_CONCURRENCY};
use shelfscribe_providers::{FanoutOutcome, NormalizedWork, ProviderFanout};
use shelfscribe_session::{JobPatch, SessionHandle};

use crate::error::DriverError;
use crate::fault::fail_job;
use crate::validate::BookInput;

/// Wraps a `ProviderFanout` with an ISBN-keyed fast path: an exact ISBN match skips the
/// title/author fan-out entirely, the way a real catalog lookup would (§4.G
/// "`enrichSingle` chains `Cache.Get(isbn)` then `ProviderFanout(title+author)`").
pub struct BatchEnricher {
    fanout: Arc<ProviderFanout>,
    isbn_cache: Cache<Arc<NormalizedWork>>,
}

impl BatchEnricher {
    pub fn new(fanout: Arc<ProviderFanout>) -> Self {
        Self {
            fanout,
            isbn_cache: Cache::new(),
        }
    }

    pub async fn run(self: Arc<Self>, session: SessionHandle, books: Vec<BookInput>) {
        if let Err(err) = self.clone().run_inner(&session, books).await {
            fail_job(&session, Pipeline::BatchEnrichment, ErrorCode::EBatchProcessingFailed, &err.to_string()).await;
        }
    }

    async fn run_inner(self: Arc<Self>, session: &SessionHandle, books: Vec<BookInput>) -> Result<(), DriverError> {
        let total = books.len();
        session.init_job_state(Pipeline::BatchEnrichment, total as u32).await?;
        session.send_started(json!({ "totalCount": total })).await?;

        let started_at = Instant::now();

        // One consumer drains completion events in strict order, so the session's
        // outbound FIFO guarantee survives `enrich_all` fanning work across workers.
        let (progress_tx, mut progress_rx) = tokio::sync::mpsc::unbounded_channel::<usize>();
        let progress_session = session.clone();
        let progress_task = tokio::spawn(async move {
            while let Some(completed) = progress_rx.recv().await {
                let progress = completed as f64 / total.max(1) as f64;
                let _ = progress_session
                    .update_job_state(JobPatch { processed_count: Some(completed as u32), results: None })
                    .await;
                let _ = progress_session
                    .send_progress(
                        json!({ "progress": progress, "status": "processing", "processedCount": completed }),
                        false,
                    )
                    .await;
            }
        });

        let results = shelfscribe_enrich::enrich_all(
            books,
            ENRICH_CONCURRENCY,
            {
                let this = self.clone();
                move |book: BookInput| {
                    let this = this.clone();
                    async move { Ok::<EnrichedBook, String>(this.enrich_single(book).await) }
                }
            },
            |book, message| EnrichedBook::errored(book, message),
            move |completed, _total, _has_error| {
                let _ = progress_tx.send(completed);
            },
        )
        .await;
        let _ = progress_task.await;

        let success_count = results.iter().filter(|b| b.enrichment_status == "success").count();
        let failure_count = results.len() - success_count;
        let payload = json!({
            "totalProcessed": results.len(),
            "successCount": success_count,
            "failureCount": failure_count,
            "duration": started_at.elapsed().as_millis() as u64,
            "enrichedBooks": results,
        });

        session.complete_job_state(payload.clone()).await?;
        session.send_complete(payload).await?;
        Ok(())
    }

    async fn enrich_single(&self, book: BookInput) -> EnrichedBook {
        let now = chrono::Utc::now();
        if let Some(isbn) = &book.isbn {
            if let Some(Some(work)) = self.isbn_cache.get(isbn, now) {
                return EnrichedBook::found(&book, work.as_ref(), "isbn-cache");
            }
        }

        let outcome = self.fanout.query(&book.title, book.author.as_deref()).await;
        match outcome.as_ref() {
            FanoutOutcome::Found { work, provider } => {
                if let Some(isbn) = &book.isbn {
                    self.isbn_cache.put_ok(isbn.clone(), Arc::new(work.clone()), std::time::Duration::from_secs(24 * 60 * 60), now);
                }
                EnrichedBook::found(&book, work, provider)
            }
            FanoutOutcome::NoResults => EnrichedBook::not_found(&book),
            FanoutOutcome::Error { cause } => EnrichedBook::errored(&book, cause.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedBook {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    pub enrichment_status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work: Option<shelfscribe_providers::Work>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editions: Option<Vec<shelfscribe_providers::Edition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<shelfscribe_providers::Author>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EnrichedBook {
    fn found(book: &BookInput, work: &NormalizedWork, provider: impl Into<String>) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            enrichment_status: "success",
            work: Some(work.work.clone()),
            editions: Some(work.editions.clone()),
            authors: Some(work.authors.clone()),
            provider: Some(provider.into()),
            error: None,
        }
    }

    fn not_found(book: &BookInput) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            enrichment_status: "not_found",
            work: None,
            editions: None,
            authors: None,
            provider: None,
            error: None,
        }
    }

    fn errored(book: &BookInput, message: impl Into<String>) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            enrichment_status: "error",
            work: None,
            editions: None,
            authors: None,
            provider: None,
            error: Some(message.into()),
        }
    }
}
