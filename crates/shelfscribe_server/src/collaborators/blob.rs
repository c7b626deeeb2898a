//! In-process blob storage for uploaded shelf-scan photos, the same "one pluggable
//! backend, in-memory shipped" split `shelfscribe_storage::MemoryCheckpointStore` uses
//! for checkpoints.

use async_trait::async_trait;
use dashmap::DashMap;
use shelfscribe_drivers::BlobStore;

#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: DashMap<String, Vec<u8>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), String> {
        self.objects.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, String> {
        self.objects.get(key).map(|v| v.clone()).ok_or_else(|| format!("no blob at {key}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_put_blob() {
        let store = InMemoryBlobStore::new();
        store.put("scans/J1/photo-0", vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.get("scans/J1/photo-0").await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn missing_key_is_an_error() {
        let store = InMemoryBlobStore::new();
        assert!(store.get("nope").await.is_err());
    }
}
