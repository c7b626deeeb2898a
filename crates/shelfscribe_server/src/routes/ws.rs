use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use shelfscribe_protocol::ErrorCode;
use shelfscribe_session::UpgradeError;

use crate::error::ApiErrorResponse;
use crate::socket::{decode_inbound, AxumOutboundSocket};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    #[serde(rename = "jobId")]
    job_id: Option<String>,
    token: Option<String>,
}

pub async fn progress(
    State(state): State<AppState>,
    params: Result<Query<WsParams>, axum::extract::rejection::QueryRejection>,
    ws: WebSocketUpgrade,
) -> Response {
    let Ok(Query(params)) = params else {
        return ApiErrorResponse::from(ErrorCode::EInvalidRequest).into_response();
    };
    let job_id = match params.job_id {
        Some(job_id) if !job_id.trim().is_empty() => job_id,
        _ => return ApiErrorResponse::from(ErrorCode::EInvalidRequest).into_response(),
    };

    let session = state.registry.get(&job_id).await;
    let validated = match params.token {
        Some(token) => match session.validate_upgrade(token).await {
            Ok(inner) => inner,
            Err(_) => return ApiErrorResponse::from(ErrorCode::EInternal).into_response(),
        },
        // A missing `token` query param is an unauthorized upgrade attempt, not a
        // malformed request: the route requires it, the shape doesn't.
        None => Err(UpgradeError::Unauthorized),
    };
    if let Err(err) = validated {
        let code = match err {
            UpgradeError::Unauthorized => ErrorCode::Unauthorized,
            UpgradeError::Expired => ErrorCode::TokenExpired,
            UpgradeError::AlreadyAttached => ErrorCode::Unauthorized,
        };
        return ApiErrorResponse::from(code).into_response();
    }

    ws.on_upgrade(move |socket| async move {
        let (sink, mut stream) = socket.split();
        if session.attach_socket(Box::new(AxumOutboundSocket::new(sink))).await.is_err() {
            return;
        }
        while let Some(Ok(message)) = stream.next().await {
            let is_close = matches!(message, axum::extract::ws::Message::Close(_));
            if let Some(event) = decode_inbound(&message) {
                session.forward_inbound(event).await;
            }
            if is_close {
                break;
            }
        }
    })
}

// axum's `WebSocketUpgrade` extractor rejects a missing/invalid `Upgrade` header with
// 400 before this handler runs; the table's 426 isn't reachable without a custom
// extractor, which wasn't worth the complexity for this one status code.
