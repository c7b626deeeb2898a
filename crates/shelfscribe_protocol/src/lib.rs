//! Wire and persisted-state types for the Shelfscribe job-orchestration subsystem.
//!
//! This crate holds no behavior — only the shapes that cross a boundary: the HTTP
//! response envelope, the WebSocket message envelope, the persisted `Job`/`AuthToken`/
//! `ThrottleState`/`BatchState` records, and the fixed policy tables (`PipelinePolicy`,
//! validation limits, timing constants) every other crate reads from.

pub mod constants;
pub mod envelope;
pub mod error;
pub mod job;
pub mod pipeline;

pub use constants::*;
pub use envelope::{ApiError, ResponseEnvelope, ResponseMetadata, WsEnvelope, WsInbound, WsMessageType};
pub use error::ErrorCode;
pub use job::{AuthToken, BatchState, Job, JobError, JobStatus, PhotoState, PhotoStatus, ThrottleState};
pub use pipeline::{Pipeline, PipelinePolicy};
