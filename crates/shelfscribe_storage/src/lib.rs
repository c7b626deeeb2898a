//! Checkpoint storage facade for Shelfscribe Sessions.
//!
//! Mirrors `casparian_state_store::StateStore`'s split between a thin facade and a
//! pluggable backend trait object: callers hold a `CheckpointStore` trait object and
//! never see the concrete backend. The only backend shipped here is in-memory — the
//! spec's "Persisted keys" contract (§6) only requires that state written before a
//! Session is evicted is readable after, which an `Arc`-shared map already satisfies
//! for a single process. A durable backend (sqlite/postgres, the way
//! `casparian_state_store` offers both) can be added later behind the same trait.

mod memory;

pub use memory::MemoryCheckpointStore;

use async_trait::async_trait;
use shelfscribe_protocol::{AuthToken, BatchState, Job, Pipeline, ThrottleState};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Everything persisted for one Session (§6 "Persisted keys (per Session)").
#[derive(Debug, Clone, Default)]
pub struct Checkpoint {
    pub job: Option<Job>,
    pub auth: Option<AuthToken>,
    pub throttle: Option<ThrottleState>,
    pub batch: Option<BatchState>,
    pub job_type: Option<Pipeline>,
    pub csv_data: Option<Vec<u8>>,
}

/// The pluggable backend a `CheckpointStore` is built over.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self, job_id: &str) -> Result<Checkpoint, StorageError>;
    async fn save_job(&self, job_id: &str, job: Job) -> Result<(), StorageError>;
    async fn save_auth(&self, job_id: &str, token: AuthToken) -> Result<(), StorageError>;
    async fn save_throttle(&self, job_id: &str, throttle: ThrottleState) -> Result<(), StorageError>;
    async fn save_batch(&self, job_id: &str, batch: BatchState) -> Result<(), StorageError>;
    async fn save_job_type(&self, job_id: &str, pipeline: Pipeline) -> Result<(), StorageError>;
    async fn save_csv_data(&self, job_id: &str, data: Vec<u8>) -> Result<(), StorageError>;
    /// Delete `job`, `authToken`, `authTokenExpiration`, `throttleState` (and batch/csv
    /// data, if present) — the cleanup alarm's effect (§4.E).
    async fn delete_session(&self, job_id: &str) -> Result<(), StorageError>;
}
