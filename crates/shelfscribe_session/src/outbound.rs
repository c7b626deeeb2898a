//! Bounded outbound socket queue with the overflow/coalescing rules from §4.E.
//!
//! FIFO ordering is preserved for everything that survives; `job_complete`/`error`
//! messages are never dropped, keep-alives are dropped first on overflow, and adjacent
//! `job_progress` messages coalesce down to the newest.

use std::collections::VecDeque;

use shelfscribe_protocol::{WsEnvelope, WsMessageType};

pub struct QueuedMessage {
    pub envelope: WsEnvelope,
    pub is_keepalive: bool,
}

fn is_undroppable(kind: WsMessageType) -> bool {
    matches!(kind, WsMessageType::JobComplete | WsMessageType::Error)
}

pub struct OutboundQueue {
    capacity: usize,
    items: VecDeque<QueuedMessage>,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity.min(64)),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Enqueue `message`. Returns `false` if the message had to be dropped outright
    /// (never happens for `job_complete`/`error`, which always get through).
    pub fn push(&mut self, message: QueuedMessage) -> bool {
        if is_undroppable(message.envelope.kind) {
            self.items.push_back(message);
            return true;
        }

        if self.items.len() < self.capacity {
            self.items.push_back(message);
            return true;
        }

        if let Some(pos) = self.items.iter().position(|m| m.is_keepalive) {
            self.items.remove(pos);
            self.items.push_back(message);
            return true;
        }

        if message.envelope.kind == WsMessageType::JobProgress {
            if let Some(pos) = self.items.iter().position(|m| m.envelope.kind == WsMessageType::JobProgress) {
                self.items.remove(pos);
                self.items.push_back(message);
                return true;
            }
        }

        tracing::warn!(job_id = %message.envelope.job_id, "outbound queue full, dropping message");
        false
    }

    pub fn pop(&mut self) -> Option<QueuedMessage> {
        self.items.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfscribe_protocol::Pipeline;

    fn msg(kind: WsMessageType, is_keepalive: bool) -> QueuedMessage {
        QueuedMessage {
            envelope: WsEnvelope::new(kind, "J1", Pipeline::BatchEnrichment, 0, serde_json::json!({})),
            is_keepalive,
        }
    }

    #[test]
    fn fifo_order_preserved_under_capacity() {
        let mut q = OutboundQueue::new(10);
        q.push(msg(WsMessageType::JobStarted, false));
        q.push(msg(WsMessageType::JobProgress, false));
        assert_eq!(q.pop().unwrap().envelope.kind, WsMessageType::JobStarted);
        assert_eq!(q.pop().unwrap().envelope.kind, WsMessageType::JobProgress);
    }

    #[test]
    fn overflow_drops_keepalive_first() {
        let mut q = OutboundQueue::new(2);
        assert!(q.push(msg(WsMessageType::JobStarted, true)));
        assert!(q.push(msg(WsMessageType::JobProgress, false)));
        assert!(q.push(msg(WsMessageType::JobProgress, false)));
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop().unwrap().envelope.kind, WsMessageType::JobProgress);
    }

    #[test]
    fn overflow_coalesces_progress_when_no_keepalive() {
        let mut q = OutboundQueue::new(1);
        assert!(q.push(msg(WsMessageType::JobProgress, false)));
        assert!(q.push(msg(WsMessageType::JobProgress, false)));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn complete_and_error_are_never_dropped() {
        let mut q = OutboundQueue::new(1);
        q.push(msg(WsMessageType::JobProgress, false));
        assert!(q.push(msg(WsMessageType::JobComplete, false)));
        assert_eq!(q.len(), 2);
    }
}
