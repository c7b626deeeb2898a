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
use shelfscribe_drivers::validate::{validate_batch, BookInput};

#[derive(Debug, Deserialize)]
pub struct EnrichRequest {
    job_id: String,
    books: Vec<BookInput>,
}

pub async fn enrich(State(state): State<AppState>, body: Result<Json<EnrichRequest>, axum::extract::rejection::JsonRejection>) -> axum::response::Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(_) => return ApiErrorResponse::from(ErrorCode::EInvalidRequest).into_response(),
    };

    if request.job_id.trim().is_empty() {
        return ApiErrorResponse::from(ErrorCode::EInvalidRequest).into_response();
    }

    let books = match validate_batch(request.books) {
        Ok(books) => books,
        Err(code) => return ApiErrorResponse::from(code).into_response(),
    };
    let total = books.len();

    let session = state.registry.get(&request.job_id).await;
    let token = new_auth_token_value();
    if session.set_auth_token(token.clone(), AUTH_TOKEN_LIFETIME).await.is_err() {
        return ApiErrorResponse::from(ErrorCode::EInternal).into_response();
    }

    let enricher = state.batch_enricher.clone();
    tokio::spawn(enricher.run(session, books));

    let envelope = ResponseEnvelope::ok(json!({
        "jobId": request.job_id,
        "token": token,
        "success": true,
        "processedCount": 0,
        "totalCount": total,
    }));
    (StatusCode::ACCEPTED, Json(envelope)).into_response()
}
