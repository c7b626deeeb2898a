//! The `shelf_scan` pipeline (§4.G): upload photos, scan each one sequentially for
//! books, and deduplicate the combined results across photos.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use serde::Serialize;
use serde_json::json;
use shelfscribe_protocol::{ErrorCode, Pipeline, PhotoStatus};
use shelfscribe_session::SessionHandle;

use crate::collaborators::{BlobStore, ImageScanner, ScannedBook};
use crate::error::DriverError;
use crate::fault::fail_job;
use crate::validate::ImageInput;

pub struct ShelfScanDriver {
    blob: Arc<dyn BlobStore>,
    scanner: Arc<dyn ImageScanner>,
}

impl ShelfScanDriver {
    pub fn new(blob: Arc<dyn BlobStore>, scanner: Arc<dyn ImageScanner>) -> Self {
        Self { blob, scanner }
    }

    pub async fn run(self: Arc<Self>, session: SessionHandle, job_id: String, images: Vec<ImageInput>) {
        if let Err(err) = self.run_inner(&session, &job_id, images).await {
            fail_job(&session, Pipeline::ShelfScan, ErrorCode::EBatchProcessingFailed, &err.to_string()).await;
        }
    }

    async fn run_inner(&self, session: &SessionHandle, job_id: &str, images: Vec<ImageInput>) -> Result<(), DriverError> {
        let photo_count = images.len();

        session.init_job_state(Pipeline::ShelfScan, photo_count as u32).await?;
        session.init_batch(photo_count).await?;
        session
            .send_started(json!({ "totalPhotos": photo_count, "status": "processing" }))
            .await?;

        self.upload_all(job_id, &images).await?;

        let mut photo_books: Vec<Vec<ScannedBook>> = vec![Vec::new(); photo_count];
        for (index, _image) in images.iter().enumerate() {
            if session.is_batch_canceled().await? {
                for remaining in index..photo_count {
                    let _ = session.update_photo(remaining, PhotoStatus::Skipped, 0, None).await;
                }
                break;
            }

            let key = blob_key(job_id, index);
            let scanned = match self.blob.get(&key).await {
                Ok(bytes) => self.scanner.scan(&bytes).await,
                Err(e) => Err(e),
            };

            match scanned {
                Ok(books) => {
                    let _ = session.update_photo(index, PhotoStatus::Complete, books.len() as u32, None).await;
                    photo_books[index] = books;
                }
                Err(err) => {
                    let _ = session.update_photo(index, PhotoStatus::Error, 0, Some(err)).await;
                }
            }
        }

        let deduped = dedupe_books(&photo_books);
        let photo_results: Vec<_> = photo_books.iter().map(|books| books.len()).collect();
        let payload = json!({
            "status": "complete",
            "totalBooks": deduped.len(),
            "photoResults": photo_results,
            "books": deduped,
        });
        session.complete_batch(deduped.len() as u32, payload).await?;
        Ok(())
    }

    async fn upload_all(&self, job_id: &str, images: &[ImageInput]) -> Result<(), DriverError> {
        let uploads = images.iter().enumerate().map(|(index, image)| {
            let key = blob_key(job_id, index);
            let blob = self.blob.clone();
            let data = image.data.clone();
            async move {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(data.as_bytes())
                    .map_err(|e| e.to_string())?;
                blob.put(&key, bytes).await
            }
        });
        futures::future::try_join_all(uploads)
            .await
            .map_err(DriverError::External)?;
        Ok(())
    }
}

fn blob_key(job_id: &str, index: usize) -> String {
    format!("scans/{job_id}/photo-{index}")
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct DedupedBook {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    isbn: Option<String>,
    confidence: f64,
}

/// Dedupe across photos: primary key is `isbn`, fallback `title::author`. On a
/// collision, keep the record with the higher confidence (§4.G, §8 invariant 9).
fn dedupe_books(photo_books: &[Vec<ScannedBook>]) -> Vec<DedupedBook> {
    let mut best: HashMap<String, ScannedBook> = HashMap::new();
    for book in photo_books.iter().flatten() {
        let key = book
            .isbn
            .clone()
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| format!("{}::{}", book.title, book.author.clone().unwrap_or_default()));
        match best.get(&key) {
            Some(existing) if existing.confidence >= book.confidence => {}
            _ => {
                best.insert(key, book.clone());
            }
        }
    }
    best.into_values()
        .map(|b| DedupedBook { title: b.title, author: b.author, isbn: b.isbn, confidence: b.confidence })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(title: &str, isbn: Option<&str>, confidence: f64) -> ScannedBook {
        ScannedBook { title: title.into(), author: None, isbn: isbn.map(String::from), confidence }
    }

    #[test]
    fn dedupes_by_isbn_keeping_higher_confidence() {
        let photos = vec![
            vec![book("Dune", Some("123"), 0.4)],
            vec![book("Dune", Some("123"), 0.9)],
        ];
        let result = dedupe_books(&photos);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].confidence, 0.9);
    }

    #[test]
    fn falls_back_to_title_author_key_without_isbn() {
        let photos = vec![vec![book("Dune", None, 0.5)], vec![book("Dune", None, 0.7)]];
        let result = dedupe_books(&photos);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].confidence, 0.7);
    }
}
