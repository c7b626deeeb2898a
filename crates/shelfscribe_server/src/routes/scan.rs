use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use shelfscribe_protocol::{ErrorCode, ResponseEnvelope, AUTH_TOKEN_LIFETIME};
use shelfscribe_security::token::new_auth_token_value;

use crate::error::ApiErrorResponse;
use crate::state::AppState;
use shelfscribe_drivers::validate::{validate_images, ImageInput};

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    job_id: String,
    images: Vec<ImageInput>,
}

pub async fn scan(State(state): State<AppState>, body: Result<Json<ScanRequest>, axum::extract::rejection::JsonRejection>) -> axum::response::Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(_) => return ApiErrorResponse::from(ErrorCode::EInvalidRequest).into_response(),
    };

    if request.job_id.trim().is_empty() {
        return ApiErrorResponse::from(ErrorCode::EInvalidRequest).into_response();
    }
    if let Err(code) = validate_images(&request.images) {
        return ApiErrorResponse::from(code).into_response();
    }
    let total_photos = request.images.len();

    let session = state.registry.get(&request.job_id).await;
    let token = new_auth_token_value();
    if session.set_auth_token(token.clone(), AUTH_TOKEN_LIFETIME).await.is_err() {
        return ApiErrorResponse::from(ErrorCode::EInternal).into_response();
    }

    let driver = state.shelf_scan.clone();
    tokio::spawn(driver.run(session, request.job_id.clone(), request.images));

    let envelope = ResponseEnvelope::ok(json!({
        "jobId": request.job_id,
        "token": token,
        "totalPhotos": total_photos,
        "status": "processing",
    }));
    (StatusCode::ACCEPTED, Json(envelope)).into_response()
}
