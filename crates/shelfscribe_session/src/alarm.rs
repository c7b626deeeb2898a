//! Pipeline-specific continuation invoked when a Session's delayed alarm fires for a
//! non-cleanup reason (currently: kicking off the CSV-import parse pipeline, §4.G).
//!
//! Cleanup alarms (the common case — evict a terminal Session's persisted state after
//! 24h) are handled by the Session itself and never reach this trait.

use async_trait::async_trait;

#[async_trait]
pub trait AlarmHandler: Send + Sync {
    async fn handle_alarm(&self, job_id: &str, payload: serde_json::Value);
}
