//! Shared "driver caught an error at its top frame" path (§7 "Driver/internal"):
//! every pipeline converts an unhandled failure into one `SendError` envelope plus a
//! `FailJobState` transition, marked `retryable` unless the failure is structural.

use serde_json::json;
use shelfscribe_protocol::{ErrorCode, JobError, Pipeline};
use shelfscribe_session::SessionHandle;

pub async fn fail_job(session: &SessionHandle, _pipeline: Pipeline, code: ErrorCode, message: &str) {
    tracing::warn!(%code, message, "driver failed, converting to SendError + FailJobState");
    let retryable = !matches!(code, ErrorCode::EInvalidRequest | ErrorCode::EInvalidImages);
    let details = if code == ErrorCode::ECsvProcessingFailed {
        Some(json!({ "fallbackAvailable": true }))
    } else {
        None
    };
    let mut payload = json!({
        "code": code.as_str(),
        "message": message,
        "retryable": retryable,
    });
    if let Some(details) = details.clone() {
        payload["details"] = details;
    }
    let _ = session.send_error(payload).await;
    let _ = session
        .fail_job_state(JobError { code, message: message.to_string(), details })
        .await;
}
