use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use shelfscribe_protocol::{ErrorCode, ResponseEnvelope};
use shelfscribe_session::RefreshError;

use crate::error::ApiErrorResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    job_id: String,
    old_token: String,
}

pub async fn refresh(State(state): State<AppState>, body: Result<Json<RefreshRequest>, axum::extract::rejection::JsonRejection>) -> axum::response::Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(_) => return ApiErrorResponse::from(ErrorCode::EInvalidRequest).into_response(),
    };

    if request.job_id.trim().is_empty() || request.old_token.trim().is_empty() {
        return ApiErrorResponse::from(ErrorCode::EInvalidRequest).into_response();
    }

    let session = state.registry.get(&request.job_id).await;
    let refreshed = match session.refresh_auth_token(request.old_token).await {
        Ok(inner) => inner,
        Err(_) => return ApiErrorResponse::from(ErrorCode::EInternal).into_response(),
    };

    let refreshed = match refreshed {
        Ok(refreshed) => refreshed,
        Err(RefreshError::InProgress) => return ApiErrorResponse::from(ErrorCode::RefreshInProgress).into_response(),
        Err(RefreshError::Invalid) => return ApiErrorResponse::from(ErrorCode::Unauthorized).into_response(),
        Err(RefreshError::Expired) => return ApiErrorResponse::from(ErrorCode::TokenExpired).into_response(),
        Err(RefreshError::TooEarly) => return ApiErrorResponse::from(ErrorCode::RefreshTooEarly).into_response(),
    };

    let envelope = ResponseEnvelope::ok(json!({
        "jobId": request.job_id,
        "token": refreshed.value,
        "expiresIn": refreshed.expires_in.as_secs(),
    }));
    (StatusCode::OK, Json(envelope)).into_response()
}
