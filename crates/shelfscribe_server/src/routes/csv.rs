use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use shelfscribe_protocol::{ErrorCode, ResponseEnvelope, AUTH_TOKEN_LIFETIME, MAX_CSV_BYTES};
use shelfscribe_security::token::new_auth_token_value;
use uuid::Uuid;

use crate::error::ApiErrorResponse;
use crate::state::AppState;

pub async fn import_csv(State(state): State<AppState>, mut multipart: Multipart) -> axum::response::Response {
    let mut csv_bytes: Option<Vec<u8>> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(_) => return ApiErrorResponse::from(ErrorCode::EInvalidRequest).into_response(),
        };
        if field.name() != Some("file") {
            continue;
        }
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(_) => return ApiErrorResponse::from(ErrorCode::EInvalidRequest).into_response(),
        };
        if bytes.len() > MAX_CSV_BYTES {
            return ApiErrorResponse::from(ErrorCode::EFileTooLarge).into_response();
        }
        csv_bytes = Some(bytes.to_vec());
    }

    let Some(csv_bytes) = csv_bytes else {
        return ApiErrorResponse::from(ErrorCode::EMissingFile).into_response();
    };

    let job_id = Uuid::new_v4().to_string();
    let session = state.registry.get(&job_id).await;
    let token = new_auth_token_value();
    if session.set_auth_token(token.clone(), AUTH_TOKEN_LIFETIME).await.is_err() {
        return ApiErrorResponse::from(ErrorCode::EInternal).into_response();
    }

    if shelfscribe_drivers::csv_import::accept(&session, csv_bytes).await.is_err() {
        return ApiErrorResponse::from(ErrorCode::EInternal).into_response();
    }

    let envelope = ResponseEnvelope::ok(json!({ "jobId": job_id, "token": token }));
    (StatusCode::ACCEPTED, Json(envelope)).into_response()
}
