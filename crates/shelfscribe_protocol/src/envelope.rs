//! The HTTP response envelope and the WebSocket message envelope (§6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::pipeline::Pipeline;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_str().to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

impl ResponseMetadata {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            processing_time: None,
            provider: None,
            cached: None,
        }
    }
}

/// `{data, metadata, error?}` — every HTTP JSON response on the core surface uses this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    pub data: Option<T>,
    pub metadata: ResponseMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> ResponseEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            metadata: ResponseMetadata::now(),
            error: None,
        }
    }

    pub fn err(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            data: None,
            metadata: ResponseMetadata::now(),
            error: Some(ApiError::new(code, message)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    JobStarted,
    JobProgress,
    JobComplete,
    Error,
    ReadyAck,
    #[serde(rename = "batch-init")]
    BatchInit,
    #[serde(rename = "batch-progress")]
    BatchProgress,
    #[serde(rename = "batch-complete")]
    BatchComplete,
    #[serde(rename = "batch-canceling")]
    BatchCanceling,
}

/// `{type, jobId, pipeline, timestamp, version, payload}` — every outbound WebSocket
/// message uses this shape (§6). `payload` is left as `serde_json::Value` because its
/// schema is a function of `type`/`pipeline`, not of the envelope itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsEnvelope {
    #[serde(rename = "type")]
    pub kind: WsMessageType,
    pub job_id: String,
    pub pipeline: Pipeline,
    pub timestamp: i64,
    pub version: String,
    pub payload: serde_json::Value,
}

impl WsEnvelope {
    pub fn new(
        kind: WsMessageType,
        job_id: impl Into<String>,
        pipeline: Pipeline,
        timestamp_millis: i64,
        payload: impl Serialize,
    ) -> Self {
        Self {
            kind,
            job_id: job_id.into(),
            pipeline,
            timestamp: timestamp_millis,
            version: crate::constants::WS_PROTOCOL_VERSION.to_string(),
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Inbound WebSocket messages. Only `{type: "ready"}` is recognized; everything else
/// deserializes into `Other` and is logged and ignored by the Session.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsInbound {
    Ready,
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips() {
        let env = ResponseEnvelope::ok(serde_json::json!({"jobId": "J1"}));
        let text = serde_json::to_string(&env).unwrap();
        let back: ResponseEnvelope<serde_json::Value> = serde_json::from_str(&text).unwrap();
        assert_eq!(back.data.unwrap()["jobId"], "J1");
        assert!(back.error.is_none());
    }

    #[test]
    fn ws_inbound_unknown_types_are_other() {
        let parsed: WsInbound = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(parsed, WsInbound::Other));
        let parsed: WsInbound = serde_json::from_str(r#"{"type":"ready"}"#).unwrap();
        assert!(matches!(parsed, WsInbound::Ready));
    }

    #[test]
    fn ws_batch_type_renders_with_hyphen() {
        let env = WsEnvelope::new(
            WsMessageType::BatchProgress,
            "J1",
            Pipeline::ShelfScan,
            0,
            serde_json::json!({}),
        );
        let text = serde_json::to_string(&env).unwrap();
        assert!(text.contains("\"batch-progress\""));
    }
}
