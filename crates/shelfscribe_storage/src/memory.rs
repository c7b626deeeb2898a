use async_trait::async_trait;
use dashmap::DashMap;
use shelfscribe_protocol::{AuthToken, BatchState, Job, Pipeline, ThrottleState};

use crate::{Checkpoint, CheckpointStore, StorageError};

/// Process-local checkpoint backend. Good enough for the durability contract the spec
/// actually requires (survive Session eviction within one process); a fleet deployment
/// would swap this for a real KV/SQL backend behind the same `CheckpointStore` trait.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    records: DashMap<String, Checkpoint>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, job_id: &str) -> Result<Checkpoint, StorageError> {
        Ok(self.records.get(job_id).map(|r| r.clone()).unwrap_or_default())
    }

    async fn save_job(&self, job_id: &str, job: Job) -> Result<(), StorageError> {
        self.records.entry(job_id.to_string()).or_default().job = Some(job);
        Ok(())
    }

    async fn save_auth(&self, job_id: &str, token: AuthToken) -> Result<(), StorageError> {
        self.records.entry(job_id.to_string()).or_default().auth = Some(token);
        Ok(())
    }

    async fn save_throttle(&self, job_id: &str, throttle: ThrottleState) -> Result<(), StorageError> {
        self.records.entry(job_id.to_string()).or_default().throttle = Some(throttle);
        Ok(())
    }

    async fn save_batch(&self, job_id: &str, batch: BatchState) -> Result<(), StorageError> {
        self.records.entry(job_id.to_string()).or_default().batch = Some(batch);
        Ok(())
    }

    async fn save_job_type(&self, job_id: &str, pipeline: Pipeline) -> Result<(), StorageError> {
        self.records.entry(job_id.to_string()).or_default().job_type = Some(pipeline);
        Ok(())
    }

    async fn save_csv_data(&self, job_id: &str, data: Vec<u8>) -> Result<(), StorageError> {
        self.records.entry(job_id.to_string()).or_default().csv_data = Some(data);
        Ok(())
    }

    async fn delete_session(&self, job_id: &str) -> Result<(), StorageError> {
        self.records.remove(job_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shelfscribe_protocol::JobStatus;

    #[tokio::test]
    async fn survives_across_loads() {
        let store = MemoryCheckpointStore::new();
        let job = Job::new("J1", Pipeline::BatchEnrichment, 2, Utc::now());
        store.save_job("J1", job.clone()).await.unwrap();

        let loaded = store.load("J1").await.unwrap();
        assert_eq!(loaded.job.unwrap().status, JobStatus::Running);
    }

    #[tokio::test]
    async fn delete_clears_all_fields() {
        let store = MemoryCheckpointStore::new();
        store
            .save_job("J1", Job::new("J1", Pipeline::CsvImport, 0, Utc::now()))
            .await
            .unwrap();
        store.delete_session("J1").await.unwrap();
        let loaded = store.load("J1").await.unwrap();
        assert!(loaded.job.is_none());
    }
}
