//! Commands sent from a `SessionHandle` to its owning Session actor task.
//!
//! Direct generalization of `casparian_mcp::core::Command`/`Responder`: every variant
//! pairs its request data with a `oneshot::Sender` the actor uses to reply.

use std::time::Duration;

use shelfscribe_protocol::{AuthToken, Job, JobError};
use tokio::sync::oneshot;

use crate::error::{RefreshError, UpgradeError};
use crate::socket::{InboundEvent, OutboundSocket};

pub type Responder<T> = oneshot::Sender<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyOutcome {
    Ready,
    TimedOut,
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub value: String,
    pub expires_in: Duration,
}

/// `UpdateJobState` only ever patches `processed_count` and/or `results`; everything
/// else about a `Job` is set by `InitJobState`/`CompleteJobState`/`FailJobState`.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub processed_count: Option<u32>,
    pub results: Option<serde_json::Value>,
}

pub enum SessionCommand {
    SetAuthToken {
        value: String,
        lifetime: Duration,
        respond: Responder<()>,
    },
    RefreshAuthToken {
        old_value: String,
        respond: Responder<Result<RefreshedToken, RefreshError>>,
    },
    ValidateUpgrade {
        token: String,
        respond: Responder<Result<(), UpgradeError>>,
    },
    AttachSocket {
        socket: Box<dyn OutboundSocket>,
        respond: Responder<()>,
    },
    InboundEvent(InboundEvent),
    WaitForReady {
        timeout: Duration,
        respond: Responder<ReadyOutcome>,
    },
    InitJobState {
        pipeline: shelfscribe_protocol::Pipeline,
        total_count: u32,
        respond: Responder<()>,
    },
    InitCsvImport {
        csv_data: Vec<u8>,
        respond: Responder<()>,
    },
    UpdateJobState {
        patch: JobPatch,
        respond: Responder<()>,
    },
    SendStarted {
        payload: serde_json::Value,
        respond: Responder<()>,
    },
    SendProgress {
        payload: serde_json::Value,
        keepalive: bool,
        respond: Responder<()>,
    },
    SendComplete {
        payload: serde_json::Value,
        respond: Responder<()>,
    },
    SendError {
        payload: serde_json::Value,
        respond: Responder<()>,
    },
    CompleteJobState {
        results: serde_json::Value,
        respond: Responder<()>,
    },
    FailJobState {
        error: JobError,
        respond: Responder<()>,
    },
    ScheduleDelayed {
        payload: serde_json::Value,
        delay: Duration,
        respond: Responder<()>,
    },
    Cancel {
        reason: String,
        respond: Responder<()>,
    },
    IsCanceled {
        respond: Responder<bool>,
    },
    GetJobState {
        respond: Responder<Option<Job>>,
    },
    GetJobStateAndAuth {
        respond: Responder<(Option<Job>, Option<AuthToken>)>,
    },
    InitBatch {
        photo_count: usize,
        respond: Responder<()>,
    },
    UpdatePhoto {
        index: usize,
        status: shelfscribe_protocol::PhotoStatus,
        books_found: u32,
        error: Option<String>,
        respond: Responder<Result<(), crate::error::BatchError>>,
    },
    CompleteBatch {
        total_books: u32,
        results: serde_json::Value,
        respond: Responder<()>,
    },
    IsBatchCanceled {
        respond: Responder<bool>,
    },
    CancelBatch {
        respond: Responder<()>,
    },
}
