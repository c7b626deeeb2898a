//! Rate-limiting middleware, applied to the whole `/jobs/*` surface (§4.A). Keyed by
//! peer IP, the simplest `client identity` the spec's distilled RateLimiter asks for.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use shelfscribe_ratelimit::{RateLimiter, Status};

use crate::error::ApiErrorResponse;

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let key = addr.ip().to_string();
    match limiter.check_and_increment(&key, chrono::Utc::now()) {
        Status::Allowed { .. } => next.run(request).await,
        Status::Limited { retry_after } => {
            let mut response =
                ApiErrorResponse::new(shelfscribe_protocol::ErrorCode::EInvalidRequest, "rate limit exceeded")
                    .into_response();
            *response.status_mut() = axum::http::StatusCode::TOO_MANY_REQUESTS;
            // §4.A: retryAfter = ceil((resetAt - now) / 1s), so a sub-second remainder
            // still tells the client to wait at least one more second, not zero.
            let seconds = (retry_after.as_millis() as f64 / 1000.0).ceil() as u64;
            if let Ok(value) = seconds.to_string().parse() {
                response.headers_mut().insert("retry-after", value);
            }
            response
        }
    }
}
