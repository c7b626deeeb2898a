//! Binds `shelfscribe_session::socket::OutboundSocket` to `axum::extract::ws::WebSocket`'s
//! split sink, and decodes inbound frames into `InboundEvent`s (§6).

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures::stream::SplitSink;
use futures::SinkExt;
use shelfscribe_protocol::WsInbound;
use shelfscribe_session::socket::{InboundEvent, OutboundSocket, SocketError};

pub struct AxumOutboundSocket {
    sink: SplitSink<WebSocket, Message>,
}

impl AxumOutboundSocket {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl OutboundSocket for AxumOutboundSocket {
    async fn send_text(&mut self, text: String) -> Result<(), SocketError> {
        self.sink.send(Message::Text(text)).await.map_err(|e| SocketError::Send(e.to_string()))
    }

    async fn close(&mut self, code: u16, reason: &str) {
        let frame = CloseFrame { code, reason: reason.to_string().into() };
        let _ = self.sink.send(Message::Close(Some(frame))).await;
    }
}

/// Decode one inbound WebSocket frame into the `InboundEvent` the Session understands.
/// Anything that isn't `{"type":"ready"}` text collapses to `Other` and is logged by the
/// Session itself (§6 "Inbound: only ready is recognized; all others are ... ignored").
pub fn decode_inbound(message: &Message) -> Option<InboundEvent> {
    match message {
        Message::Text(text) => match serde_json::from_str::<WsInbound>(text) {
            Ok(WsInbound::Ready) => Some(InboundEvent::Ready),
            Ok(WsInbound::Other) => Some(InboundEvent::Other),
            Err(_) => Some(InboundEvent::Other),
        },
        Message::Close(_) => Some(InboundEvent::Closed),
        Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => Some(InboundEvent::Other),
    }
}
