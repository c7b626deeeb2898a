//! The Session actor: owns every mutable field of one job's state and processes
//! `SessionCommand`s one at a time off a bounded `mpsc` channel (§4.E).
//!
//! This is the async generalization of `casparian_mcp::core::Core::run`'s
//! `Receiver<Command>` loop: same single-owner discipline, `tokio::sync::mpsc` instead
//! of `std::sync::mpsc`, and a `tokio::time::Sleep` standing in for the "no second
//! thread touches this state" guarantee a dedicated OS thread gave the teacher.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use shelfscribe_protocol::{
    AuthToken, BatchState, Job, JobError, JobStatus, Pipeline, PhotoState, PhotoStatus, ThrottleState,
    WsEnvelope, WsMessageType,
};
use shelfscribe_storage::CheckpointStore;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, Instant, Sleep};

use crate::alarm::AlarmHandler;
use crate::command::{JobPatch, ReadyOutcome, RefreshedToken, SessionCommand};
use crate::error::{BatchError, RefreshError, UpgradeError};
use crate::outbound::{OutboundQueue, QueuedMessage};
use crate::socket::{InboundEvent, OutboundSocket};

const OUTBOUND_CAPACITY: usize = shelfscribe_protocol::constants::OUTBOUND_QUEUE_CAPACITY;
const CLOSE_FLUSH_DELAY: Duration = shelfscribe_protocol::constants::SEND_CLOSE_FLUSH_DELAY;
const CLEANUP_DELAY: Duration = shelfscribe_protocol::constants::CLEANUP_ALARM_DELAY;

enum AlarmKind {
    Cleanup,
    Delayed(serde_json::Value),
}

/// One-way command the Session sends to itself to close the socket after a flush delay,
/// without looping a `Responder` back through the public command surface.
enum Internal {
    CloseSocket { code: u16, reason: String },
    ReadyTimeout,
}

pub(crate) enum Envelope {
    Public(SessionCommand),
    Internal(Internal),
}

pub struct Session {
    job_id: String,
    storage: Arc<dyn CheckpointStore>,
    alarm_handler: Option<Arc<dyn AlarmHandler>>,

    commands: mpsc::Receiver<Envelope>,
    self_tx: mpsc::Sender<Envelope>,

    job: Option<Job>,
    auth: Option<AuthToken>,
    throttle: Option<ThrottleState>,
    batch: Option<BatchState>,
    job_type: Option<Pipeline>,

    socket: Option<Box<dyn OutboundSocket>>,
    outbound: OutboundQueue,
    ready_waiters: Vec<oneshot::Sender<ReadyOutcome>>,
    ready_received: bool,

    refreshing: bool,

    pending_alarm: Option<AlarmKind>,
    alarm_sleep: Pin<Box<Sleep>>,
    evicted: bool,
}

impl Session {
    pub(crate) fn new(
        job_id: String,
        storage: Arc<dyn CheckpointStore>,
        alarm_handler: Option<Arc<dyn AlarmHandler>>,
        commands: mpsc::Receiver<Envelope>,
        self_tx: mpsc::Sender<Envelope>,
        restored: shelfscribe_storage::Checkpoint,
    ) -> Self {
        Self {
            job_id,
            storage,
            alarm_handler,
            commands,
            self_tx,
            job: restored.job,
            auth: restored.auth,
            throttle: restored.throttle,
            batch: restored.batch,
            job_type: restored.job_type,
            socket: None,
            outbound: OutboundQueue::new(OUTBOUND_CAPACITY),
            ready_waiters: Vec::new(),
            ready_received: false,
            refreshing: false,
            pending_alarm: None,
            // Far-future sleep; real deadlines are installed via `arm_alarm`.
            alarm_sleep: Box::pin(sleep(Duration::from_secs(365 * 24 * 60 * 60))),
            evicted: false,
        }
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                maybe_envelope = self.commands.recv() => {
                    match maybe_envelope {
                        Some(Envelope::Public(cmd)) => self.handle_command(cmd).await,
                        Some(Envelope::Internal(Internal::CloseSocket { code, reason })) => {
                            self.close_socket(code, &reason).await;
                        }
                        Some(Envelope::Internal(Internal::ReadyTimeout)) => {
                            if !self.ready_received {
                                for waiter in self.ready_waiters.drain(..) {
                                    let _ = waiter.send(ReadyOutcome::TimedOut);
                                }
                            }
                        }
                        None => break,
                    }
                }
                _ = &mut self.alarm_sleep, if self.pending_alarm.is_some() => {
                    self.fire_alarm().await;
                    if self.evicted {
                        break;
                    }
                }
            }
        }
    }

    fn arm_alarm(&mut self, kind: AlarmKind, delay: Duration) {
        self.pending_alarm = Some(kind);
        self.alarm_sleep.as_mut().reset(Instant::now() + delay);
    }

    async fn fire_alarm(&mut self) {
        let Some(kind) = self.pending_alarm.take() else { return };
        // Park the timer far in the future until something re-arms it.
        self.alarm_sleep.as_mut().reset(Instant::now() + Duration::from_secs(365 * 24 * 60 * 60));
        match kind {
            AlarmKind::Cleanup => {
                if let Err(err) = self.storage.delete_session(&self.job_id).await {
                    tracing::warn!(job_id = %self.job_id, %err, "cleanup alarm failed to evict session");
                }
                self.close_socket(1000, "session evicted").await;
                self.evicted = true;
            }
            AlarmKind::Delayed(payload) => {
                if let Some(handler) = self.alarm_handler.clone() {
                    handler.handle_alarm(&self.job_id, payload).await;
                }
            }
        }
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::SetAuthToken { value, lifetime, respond } => {
                let token = AuthToken {
                    value,
                    expires_at: Utc::now() + chrono::Duration::from_std(lifetime).unwrap_or_default(),
                };
                self.persist_auth(token).await;
                let _ = respond.send(());
            }
            SessionCommand::RefreshAuthToken { old_value, respond } => {
                let result = self.refresh_auth_token(old_value).await;
                let _ = respond.send(result);
            }
            SessionCommand::ValidateUpgrade { token, respond } => {
                let result = self.validate_upgrade(&token);
                let _ = respond.send(result);
            }
            SessionCommand::AttachSocket { socket, respond } => {
                self.socket = Some(socket);
                self.drain_outbound().await;
                let _ = respond.send(());
            }
            SessionCommand::InboundEvent(event) => self.handle_inbound(event).await,
            SessionCommand::WaitForReady { timeout, respond } => {
                self.wait_for_ready(timeout, respond);
            }
            SessionCommand::InitJobState { pipeline, total_count, respond } => {
                self.job = Some(Job::new(self.job_id.clone(), pipeline, total_count, Utc::now()));
                self.job_type = Some(pipeline);
                self.throttle = Some(ThrottleState::fresh(Utc::now()));
                self.persist_job().await;
                self.persist_job_type(pipeline).await;
                let _ = respond.send(());
            }
            SessionCommand::InitCsvImport { csv_data, respond } => {
                self.job = Some(Job::new(self.job_id.clone(), Pipeline::CsvImport, 0, Utc::now()));
                self.job_type = Some(Pipeline::CsvImport);
                self.throttle = Some(ThrottleState::fresh(Utc::now()));
                self.persist_job().await;
                self.persist_job_type(Pipeline::CsvImport).await;
                if let Err(err) = self.storage.save_csv_data(&self.job_id, csv_data).await {
                    tracing::warn!(job_id = %self.job_id, %err, "failed to persist csv body");
                }
                let _ = respond.send(());
            }
            SessionCommand::UpdateJobState { patch, respond } => {
                self.apply_job_patch(patch).await;
                let _ = respond.send(());
            }
            SessionCommand::SendStarted { payload, respond } => {
                if self.is_job_terminal() {
                    tracing::warn!(job_id = %self.job_id, "dropping job_started send: job already in a terminal state");
                } else {
                    self.enqueue(WsMessageType::JobStarted, payload, false).await;
                }
                let _ = respond.send(());
            }
            SessionCommand::SendProgress { payload, keepalive, respond } => {
                if self.is_job_terminal() {
                    tracing::warn!(job_id = %self.job_id, "dropping job_progress send: job already in a terminal state");
                } else {
                    self.enqueue(WsMessageType::JobProgress, payload, keepalive).await;
                }
                let _ = respond.send(());
            }
            SessionCommand::SendComplete { payload, respond } => {
                self.enqueue(WsMessageType::JobComplete, payload, false).await;
                self.schedule_close_flush();
                let _ = respond.send(());
            }
            SessionCommand::SendError { payload, respond } => {
                self.enqueue(WsMessageType::Error, payload, false).await;
                self.schedule_close_flush();
                let _ = respond.send(());
            }
            SessionCommand::CompleteJobState { results, respond } => {
                self.finish_job(JobStatus::Complete, Some(results), None).await;
                let _ = respond.send(());
            }
            SessionCommand::FailJobState { error, respond } => {
                self.finish_job(JobStatus::Failed, None, Some(error)).await;
                let _ = respond.send(());
            }
            SessionCommand::ScheduleDelayed { payload, delay, respond } => {
                self.arm_alarm(AlarmKind::Delayed(payload), delay);
                let _ = respond.send(());
            }
            SessionCommand::Cancel { reason, respond } => {
                self.cancel(reason).await;
                let _ = respond.send(());
            }
            SessionCommand::IsCanceled { respond } => {
                let canceled = matches!(self.job.as_ref().map(|j| j.status), Some(JobStatus::Canceled));
                let _ = respond.send(canceled);
            }
            SessionCommand::GetJobState { respond } => {
                let _ = respond.send(self.job.clone());
            }
            SessionCommand::GetJobStateAndAuth { respond } => {
                let _ = respond.send((self.job.clone(), self.auth.clone()));
            }
            SessionCommand::InitBatch { photo_count, respond } => {
                self.batch = Some(BatchState::new(photo_count));
                self.persist_batch().await;
                let _ = respond.send(());
            }
            SessionCommand::UpdatePhoto { index, status, books_found, error, respond } => {
                let result = self.update_photo(index, status, books_found, error).await;
                let _ = respond.send(result);
            }
            SessionCommand::CompleteBatch { total_books, results, respond } => {
                if let Some(batch) = self.batch.as_mut() {
                    batch.total_books_found = total_books;
                }
                self.persist_batch().await;
                self.finish_job(JobStatus::Complete, Some(results), None).await;
                let _ = respond.send(());
            }
            SessionCommand::IsBatchCanceled { respond } => {
                let canceled = self.batch.as_ref().map(|b| b.cancel_requested).unwrap_or(false);
                let _ = respond.send(canceled);
            }
            SessionCommand::CancelBatch { respond } => {
                if let Some(batch) = self.batch.as_mut() {
                    batch.cancel_requested = true;
                }
                self.persist_batch().await;
                self.enqueue(WsMessageType::BatchCanceling, serde_json::json!({}), false).await;
                let _ = respond.send(());
            }
        }
    }

    async fn handle_inbound(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::Ready => {
                self.ready_received = true;
                for waiter in self.ready_waiters.drain(..) {
                    let _ = waiter.send(ReadyOutcome::Ready);
                }
                self.send_ready_ack().await;
            }
            InboundEvent::Closed => {
                self.socket = None;
                for waiter in self.ready_waiters.drain(..) {
                    let _ = waiter.send(ReadyOutcome::Disconnected);
                }
            }
            InboundEvent::Other => {
                tracing::debug!(job_id = %self.job_id, "ignoring unrecognized inbound message");
            }
        }
    }

    async fn send_ready_ack(&mut self) {
        let pipeline = self.job_type.unwrap_or(Pipeline::BatchEnrichment);
        let job_id = self.job_id.clone();
        let envelope = WsEnvelope::new(
            WsMessageType::ReadyAck,
            job_id,
            pipeline,
            Utc::now().timestamp_millis(),
            serde_json::json!({}),
        );
        if let Some(socket) = self.socket.as_mut() {
            let text = serde_json::to_string(&envelope).unwrap_or_default();
            // Best-effort: a dead socket here is logged and swallowed (§4.E failure semantics).
            if let Err(err) = socket.send_text(text).await {
                tracing::warn!(job_id = %self.job_id, %err, "failed to send ready_ack");
            }
        }
    }

    fn wait_for_ready(&mut self, timeout: Duration, respond: oneshot::Sender<ReadyOutcome>) {
        if self.ready_received {
            let _ = respond.send(ReadyOutcome::Ready);
            return;
        }
        self.ready_waiters.push(respond);
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(Envelope::Internal(Internal::ReadyTimeout)).await;
        });
    }

    fn validate_upgrade(&self, token: &str) -> Result<(), UpgradeError> {
        if self.socket.is_some() {
            return Err(UpgradeError::AlreadyAttached);
        }
        let Some(auth) = &self.auth else {
            return Err(UpgradeError::Unauthorized);
        };
        if auth.value != token {
            return Err(UpgradeError::Unauthorized);
        }
        if !auth.is_valid_at(Utc::now()) {
            return Err(UpgradeError::Expired);
        }
        Ok(())
    }

    async fn refresh_auth_token(&mut self, old_value: String) -> Result<RefreshedToken, RefreshError> {
        if self.refreshing {
            return Err(RefreshError::InProgress);
        }
        let Some(auth) = self.auth.clone() else {
            return Err(RefreshError::Invalid);
        };
        if auth.value != old_value {
            return Err(RefreshError::Invalid);
        }
        let now = Utc::now();
        if !auth.is_valid_at(now) {
            return Err(RefreshError::Expired);
        }
        let lifetime = shelfscribe_protocol::constants::AUTH_TOKEN_LIFETIME;
        let refresh_window = chrono::Duration::from_std(shelfscribe_protocol::constants::AUTH_REFRESH_WINDOW)
            .unwrap_or_default();
        if !auth.within_refresh_window(now, refresh_window) {
            return Err(RefreshError::TooEarly);
        }

        self.refreshing = true;
        let new_value = shelfscribe_security::token::new_auth_token_value();
        let new_token = AuthToken {
            value: new_value.clone(),
            expires_at: now + chrono::Duration::from_std(lifetime).unwrap_or_default(),
        };
        self.persist_auth(new_token).await;
        self.refreshing = false;

        Ok(RefreshedToken { value: new_value, expires_in: lifetime })
    }

    async fn apply_job_patch(&mut self, patch: JobPatch) {
        let Some(job) = self.job.as_mut() else { return };
        if let Some(count) = patch.processed_count {
            job.processed_count = count;
        }
        if patch.results.is_some() {
            job.results = patch.results;
        }

        let pipeline = job.pipeline;
        let policy = pipeline.policy();
        let now = Utc::now();
        let throttle = self.throttle.get_or_insert_with(|| ThrottleState::fresh(now));

        if throttle.should_persist(policy, now) {
            job.version += 1;
            *throttle = ThrottleState::fresh(now);
            self.persist_job().await;
            self.persist_throttle().await;
        } else {
            throttle.updates_since_last_persist += 1;
        }
    }

    /// Terminal states are sticky (§4.E): once a Job has completed, failed, or been
    /// canceled, `job_started`/`job_progress` sends are dropped rather than reopening
    /// a closed story. `job_complete`/`error` themselves are exempt — they're sent as
    /// part of the transition into a terminal state, not after one.
    fn is_job_terminal(&self) -> bool {
        self.job.as_ref().map(|job| job.status.is_terminal()).unwrap_or(false)
    }

    async fn finish_job(&mut self, status: JobStatus, results: Option<serde_json::Value>, error: Option<JobError>) {
        let Some(job) = self.job.as_mut() else { return };
        if job.status.is_terminal() {
            tracing::warn!(job_id = %self.job_id, "ignoring transition out of terminal state");
            return;
        }
        job.status = status;
        job.end_time = Some(Utc::now());
        job.version += 1;
        if results.is_some() {
            job.results = results;
        }
        job.error = error;
        self.persist_job().await;
        self.arm_alarm(AlarmKind::Cleanup, CLEANUP_DELAY);
    }

    async fn cancel(&mut self, reason: String) {
        self.finish_job(
            JobStatus::Canceled,
            None,
            Some(JobError {
                code: shelfscribe_protocol::ErrorCode::EInternal,
                message: reason,
                details: None,
            }),
        )
        .await;
        self.close_socket(1001, "canceled").await;
    }

    async fn update_photo(
        &mut self,
        index: usize,
        status: PhotoStatus,
        books_found: u32,
        error: Option<String>,
    ) -> Result<(), BatchError> {
        let Some(batch) = self.batch.as_mut() else {
            return Err(BatchError::IndexOutOfRange { index, count: 0 });
        };
        if index >= batch.photos.len() {
            return Err(BatchError::IndexOutOfRange { index, count: batch.photos.len() });
        }
        batch.photos[index] = PhotoState { status, books_found, error };
        batch.current_photo = Some(index);
        batch.recompute_total();
        let total_books_found = batch.total_books_found;
        self.persist_batch().await;
        let payload = serde_json::json!({
            "photoIndex": index,
            "totalBooksFound": total_books_found,
        });
        self.enqueue(WsMessageType::BatchProgress, payload, false).await;
        Ok(())
    }

    fn schedule_close_flush(&mut self) {
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(CLOSE_FLUSH_DELAY).await;
            let _ = tx
                .send(Envelope::Internal(Internal::CloseSocket {
                    code: 1000,
                    reason: "job finished".to_string(),
                }))
                .await;
        });
    }

    async fn close_socket(&mut self, code: u16, reason: &str) {
        if let Some(mut socket) = self.socket.take() {
            socket.close(code, reason).await;
        }
    }

    async fn enqueue(&mut self, kind: WsMessageType, payload: serde_json::Value, is_keepalive: bool) {
        let pipeline = self.job_type.unwrap_or(Pipeline::BatchEnrichment);
        let envelope = WsEnvelope::new(kind, self.job_id.clone(), pipeline, Utc::now().timestamp_millis(), payload);
        self.outbound.push(QueuedMessage { envelope, is_keepalive });
        self.drain_outbound().await;
    }

    async fn drain_outbound(&mut self) {
        let Some(socket) = self.socket.as_mut() else { return };
        while let Some(message) = self.outbound.pop() {
            let text = match serde_json::to_string(&message.envelope) {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(%err, "failed to serialize outbound envelope");
                    continue;
                }
            };
            if let Err(err) = socket.send_text(text).await {
                tracing::warn!(job_id = %self.job_id, %err, "dropping send to closed socket");
                break;
            }
        }
    }

    async fn persist_job(&self) {
        if let Some(job) = &self.job {
            if let Err(err) = self.storage.save_job(&self.job_id, job.clone()).await {
                tracing::warn!(job_id = %self.job_id, %err, "failed to persist job");
            }
        }
    }

    async fn persist_auth(&mut self, token: AuthToken) {
        self.auth = Some(token.clone());
        if let Err(err) = self.storage.save_auth(&self.job_id, token).await {
            tracing::warn!(job_id = %self.job_id, %err, "failed to persist auth token");
        }
    }

    async fn persist_throttle(&self) {
        if let Some(throttle) = self.throttle {
            if let Err(err) = self.storage.save_throttle(&self.job_id, throttle).await {
                tracing::warn!(job_id = %self.job_id, %err, "failed to persist throttle state");
            }
        }
    }

    async fn persist_batch(&self) {
        if let Some(batch) = &self.batch {
            if let Err(err) = self.storage.save_batch(&self.job_id, batch.clone()).await {
                tracing::warn!(job_id = %self.job_id, %err, "failed to persist batch state");
            }
        }
    }

    async fn persist_job_type(&self, pipeline: Pipeline) {
        if let Err(err) = self.storage.save_job_type(&self.job_id, pipeline).await {
            tracing::warn!(job_id = %self.job_id, %err, "failed to persist job type");
        }
    }
}
