//! `SessionHandle`: the cheap, `Clone`-able front onto a Session actor task. Every
//! method sends a command and awaits the actor's one-shot reply, the direct
//! generalization of `casparian_mcp::core::CoreHandle::send_and_wait`.

use std::sync::Arc;
use std::time::Duration;

use shelfscribe_protocol::{AuthToken, Job, JobError, Pipeline, PhotoStatus};
use shelfscribe_storage::CheckpointStore;
use tokio::sync::{mpsc, oneshot};

use crate::actor::{Envelope, Session};
use crate::alarm::AlarmHandler;
use crate::command::{JobPatch, ReadyOutcome, RefreshedToken, SessionCommand};
use crate::error::{BatchError, RefreshError, SessionError, UpgradeError};
use crate::socket::{InboundEvent, OutboundSocket};

const COMMAND_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Envelope>,
}

impl SessionHandle {
    pub(crate) async fn spawn(
        job_id: String,
        storage: Arc<dyn CheckpointStore>,
        alarm_handler: Option<Arc<dyn AlarmHandler>>,
    ) -> Self {
        let restored = storage.load(&job_id).await.unwrap_or_default();
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let session = Session::new(job_id, storage, alarm_handler, rx, tx.clone(), restored);
        tokio::spawn(session.run());
        Self { tx }
    }

    /// Whether the actor task behind this handle has already exited (evicted, or
    /// panicked). The Registry uses this to decide whether to respawn on the next `get`.
    pub(crate) fn is_gone(&self) -> bool {
        self.tx.is_closed()
    }

    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(Envelope::Public(make(tx)))
            .await
            .map_err(|_| SessionError::Gone)?;
        rx.await.map_err(|_| SessionError::Gone)
    }

    pub async fn set_auth_token(&self, value: String, lifetime: Duration) -> Result<(), SessionError> {
        self.call(|respond| SessionCommand::SetAuthToken { value, lifetime, respond }).await
    }

    pub async fn refresh_auth_token(&self, old_value: String) -> Result<Result<RefreshedToken, RefreshError>, SessionError> {
        self.call(|respond| SessionCommand::RefreshAuthToken { old_value, respond }).await
    }

    pub async fn validate_upgrade(&self, token: String) -> Result<Result<(), UpgradeError>, SessionError> {
        self.call(|respond| SessionCommand::ValidateUpgrade { token, respond }).await
    }

    pub async fn attach_socket(&self, socket: Box<dyn OutboundSocket>) -> Result<(), SessionError> {
        self.call(|respond| SessionCommand::AttachSocket { socket, respond }).await
    }

    pub async fn forward_inbound(&self, event: InboundEvent) {
        let _ = self.tx.send(Envelope::Public(SessionCommand::InboundEvent(event))).await;
    }

    pub async fn wait_for_ready(&self, timeout: Duration) -> Result<ReadyOutcome, SessionError> {
        self.call(|respond| SessionCommand::WaitForReady { timeout, respond }).await
    }

    pub async fn init_job_state(&self, pipeline: Pipeline, total_count: u32) -> Result<(), SessionError> {
        self.call(|respond| SessionCommand::InitJobState { pipeline, total_count, respond }).await
    }

    pub async fn update_job_state(&self, patch: JobPatch) -> Result<(), SessionError> {
        self.call(|respond| SessionCommand::UpdateJobState { patch, respond }).await
    }

    pub async fn init_csv_import(&self, csv_data: Vec<u8>) -> Result<(), SessionError> {
        self.call(|respond| SessionCommand::InitCsvImport { csv_data, respond }).await
    }

    pub async fn send_started(&self, payload: serde_json::Value) -> Result<(), SessionError> {
        self.call(|respond| SessionCommand::SendStarted { payload, respond }).await
    }

    pub async fn send_progress(&self, payload: serde_json::Value, keepalive: bool) -> Result<(), SessionError> {
        self.call(|respond| SessionCommand::SendProgress { payload, keepalive, respond }).await
    }

    pub async fn send_complete(&self, payload: serde_json::Value) -> Result<(), SessionError> {
        self.call(|respond| SessionCommand::SendComplete { payload, respond }).await
    }

    pub async fn send_error(&self, payload: serde_json::Value) -> Result<(), SessionError> {
        self.call(|respond| SessionCommand::SendError { payload, respond }).await
    }

    pub async fn complete_job_state(&self, results: serde_json::Value) -> Result<(), SessionError> {
        self.call(|respond| SessionCommand::CompleteJobState { results, respond }).await
    }

    pub async fn fail_job_state(&self, error: JobError) -> Result<(), SessionError> {
        self.call(|respond| SessionCommand::FailJobState { error, respond }).await
    }

    pub async fn schedule_delayed(&self, payload: serde_json::Value, delay: Duration) -> Result<(), SessionError> {
        self.call(|respond| SessionCommand::ScheduleDelayed { payload, delay, respond }).await
    }

    pub async fn cancel(&self, reason: String) -> Result<(), SessionError> {
        self.call(|respond| SessionCommand::Cancel { reason, respond }).await
    }

    pub async fn is_canceled(&self) -> Result<bool, SessionError> {
        self.call(|respond| SessionCommand::IsCanceled { respond }).await
    }

    pub async fn get_job_state(&self) -> Result<Option<Job>, SessionError> {
        self.call(|respond| SessionCommand::GetJobState { respond }).await
    }

    pub async fn get_job_state_and_auth(&self) -> Result<(Option<Job>, Option<AuthToken>), SessionError> {
        self.call(|respond| SessionCommand::GetJobStateAndAuth { respond }).await
    }

    pub async fn init_batch(&self, photo_count: usize) -> Result<(), SessionError> {
        self.call(|respond| SessionCommand::InitBatch { photo_count, respond }).await
    }

    pub async fn update_photo(
        &self,
        index: usize,
        status: PhotoStatus,
        books_found: u32,
        error: Option<String>,
    ) -> Result<Result<(), BatchError>, SessionError> {
        self.call(|respond| SessionCommand::UpdatePhoto { index, status, books_found, error, respond }).await
    }

    pub async fn complete_batch(&self, total_books: u32, results: serde_json::Value) -> Result<(), SessionError> {
        self.call(|respond| SessionCommand::CompleteBatch { total_books, results, respond }).await
    }

    pub async fn is_batch_canceled(&self) -> Result<bool, SessionError> {
        self.call(|respond| SessionCommand::IsBatchCanceled { respond }).await
    }

    pub async fn cancel_batch(&self) -> Result<(), SessionError> {
        self.call(|respond| SessionCommand::CancelBatch { respond }).await
    }
}
