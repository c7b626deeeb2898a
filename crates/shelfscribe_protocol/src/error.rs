//! Stable error codes surfaced in the HTTP and WebSocket envelopes (§7).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Validation (HTTP 400/413, never change Job state)
    EInvalidRequest,
    EEmptyBatch,
    EBatchTooLarge,
    ETitleTooLong,
    EAuthorTooLong,
    EIsbnTooLong,
    EInvalidImages,
    EImageTooLarge,
    EMissingFile,
    EFileTooLarge,
    EInvalidIsbn,
    EInvalidQuery,
    // Auth (HTTP 401)
    Unauthorized,
    TokenExpired,
    RefreshTooEarly,
    RefreshInProgress,
    // Driver / internal
    ECsvProcessingFailed,
    EBatchProcessingFailed,
    EInternal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EInvalidRequest => "E_INVALID_REQUEST",
            Self::EEmptyBatch => "E_EMPTY_BATCH",
            Self::EBatchTooLarge => "E_BATCH_TOO_LARGE",
            Self::ETitleTooLong => "E_TITLE_TOO_LONG",
            Self::EAuthorTooLong => "E_AUTHOR_TOO_LONG",
            Self::EIsbnTooLong => "E_ISBN_TOO_LONG",
            Self::EInvalidImages => "E_INVALID_IMAGES",
            Self::EImageTooLarge => "E_IMAGE_TOO_LARGE",
            Self::EMissingFile => "E_MISSING_FILE",
            Self::EFileTooLarge => "E_FILE_TOO_LARGE",
            Self::EInvalidIsbn => "E_INVALID_ISBN",
            Self::EInvalidQuery => "E_INVALID_QUERY",
            Self::Unauthorized => "unauthorized",
            Self::TokenExpired => "token_expired",
            Self::RefreshTooEarly => "refresh_too_early",
            Self::RefreshInProgress => "refresh_in_progress",
            Self::ECsvProcessingFailed => "E_CSV_PROCESSING_FAILED",
            Self::EBatchProcessingFailed => "E_BATCH_PROCESSING_FAILED",
            Self::EInternal => "E_INTERNAL",
        }
    }

    /// The HTTP status this error code is always paired with on the REST surface.
    pub fn http_status(self) -> u16 {
        match self {
            Self::EFileTooLarge | Self::EImageTooLarge => 413,
            Self::Unauthorized
            | Self::TokenExpired
            | Self::RefreshTooEarly
            | Self::RefreshInProgress => 401,
            Self::EInternal => 500,
            Self::ECsvProcessingFailed | Self::EBatchProcessingFailed => 500,
            _ => 400,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
