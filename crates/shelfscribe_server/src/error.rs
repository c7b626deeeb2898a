//! Maps a validation/handler-level `ErrorCode` onto the `{data, metadata, error}` HTTP
//! envelope and the matching status code (§6, §7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shelfscribe_protocol::{ErrorCode, ResponseEnvelope};

pub struct ApiErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl From<ErrorCode> for ApiErrorResponse {
    fn from(code: ErrorCode) -> Self {
        Self::new(code, default_message(code))
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code.http_status()).unwrap_or(StatusCode::BAD_REQUEST);
        let envelope: ResponseEnvelope<()> = ResponseEnvelope::err(self.code, self.message);
        (status, Json(envelope)).into_response()
    }
}

fn default_message(code: ErrorCode) -> String {
    match code {
        ErrorCode::EInvalidRequest => "request body is malformed",
        ErrorCode::EEmptyBatch => "books must not be empty",
        ErrorCode::EBatchTooLarge => "too many books in one request",
        ErrorCode::ETitleTooLong => "title exceeds the maximum length",
        ErrorCode::EAuthorTooLong => "author exceeds the maximum length",
        ErrorCode::EIsbnTooLong => "isbn exceeds the maximum length",
        ErrorCode::EInvalidImages => "images must number 1 to 5",
        ErrorCode::EImageTooLarge => "an image exceeds the maximum decoded size",
        ErrorCode::EMissingFile => "no file was uploaded",
        ErrorCode::EFileTooLarge => "uploaded file exceeds the maximum size",
        ErrorCode::EInvalidIsbn => "isbn is invalid",
        ErrorCode::EInvalidQuery => "query is invalid",
        ErrorCode::Unauthorized => "token is missing or does not match this job",
        ErrorCode::TokenExpired => "token has expired",
        ErrorCode::RefreshTooEarly => "token is not yet within its refresh window",
        ErrorCode::RefreshInProgress => "a refresh for this token is already in progress",
        ErrorCode::ECsvProcessingFailed => "csv processing failed",
        ErrorCode::EBatchProcessingFailed => "batch processing failed",
        ErrorCode::EInternal => "internal error",
    }
    .to_string()
}
