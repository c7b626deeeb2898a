//! The socket surface a Session talks to, abstracted away from any particular
//! WebSocket library so this crate doesn't need to depend on `axum`.
//!
//! The server crate binds a concrete `OutboundSocket` over `axum::extract::ws::WebSocket`'s
//! split sink; tests bind an in-memory stub.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("socket closed")]
    Closed,
    #[error("send failed: {0}")]
    Send(String),
}

/// One outbound WebSocket connection, as seen by a Session. `close` takes a WebSocket
/// close code (1000 normal, 1001 going away — used by `Cancel`).
#[async_trait]
pub trait OutboundSocket: Send + Sync {
    async fn send_text(&mut self, text: String) -> Result<(), SocketError>;
    async fn close(&mut self, code: u16, reason: &str);
}

/// Inbound message, already decoded from the wire. The Session only interprets `Ready`;
/// anything else is logged as a protocol violation and ignored.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Ready,
    Other,
    Closed,
}
