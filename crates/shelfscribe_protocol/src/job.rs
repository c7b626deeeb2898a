//! Persisted per-Session state (§3 DATA MODEL).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::pipeline::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Complete,
    Failed,
    Canceled,
}

impl JobStatus {
    /// Terminal states are sticky: no transitions out (§3 invariant).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Canceled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// The `Job` record (§3). `version` strictly increases on every persisted mutation;
/// `processed_count <= total_count` whenever `total_count > 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub pipeline: Pipeline,
    pub total_count: u32,
    pub processed_count: u32,
    pub status: JobStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub results: Option<serde_json::Value>,
    pub error: Option<JobError>,
    pub version: u64,
}

impl Job {
    pub fn new(job_id: impl Into<String>, pipeline: Pipeline, total_count: u32, now: DateTime<Utc>) -> Self {
        Self {
            job_id: job_id.into(),
            pipeline,
            total_count,
            processed_count: 0,
            status: JobStatus::Running,
            start_time: now,
            end_time: None,
            results: None,
            error: None,
            version: 1,
        }
    }

    /// Invariant check used by tests and by the Session before persisting a patch.
    pub fn is_consistent(&self) -> bool {
        if self.total_count > 0 && self.processed_count > self.total_count {
            return false;
        }
        self.version >= 1
    }
}

/// §3 AuthToken. Validity is `now < expires_at`, strict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn within_refresh_window(&self, now: DateTime<Utc>, refresh_window: chrono::Duration) -> bool {
        self.expires_at - now <= refresh_window
    }
}

/// §3 ThrottleState. Persisted alongside `Job` to survive Session eviction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThrottleState {
    pub updates_since_last_persist: u32,
    pub last_persist_at: DateTime<Utc>,
}

impl ThrottleState {
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            updates_since_last_persist: 0,
            last_persist_at: now,
        }
    }

    /// Whether either PipelinePolicy threshold has been crossed.
    pub fn should_persist(&self, policy: crate::pipeline::PipelinePolicy, now: DateTime<Utc>) -> bool {
        let elapsed = now - self.last_persist_at;
        self.updates_since_last_persist + 1 >= policy.updates_threshold
            || elapsed
                >= chrono::Duration::from_std(policy.time_threshold).unwrap_or(chrono::Duration::zero())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoStatus {
    Queued,
    Processing,
    Complete,
    Error,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoState {
    pub status: PhotoStatus,
    pub books_found: u32,
    pub error: Option<String>,
}

impl PhotoState {
    pub fn queued() -> Self {
        Self {
            status: PhotoStatus::Queued,
            books_found: 0,
            error: None,
        }
    }
}

/// §3 BatchState (shelf_scan only). `1 <= photos.len() <= 5`;
/// `total_books_found` is always the sum across `photos`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchState {
    pub photos: Vec<PhotoState>,
    pub total_books_found: u32,
    pub cancel_requested: bool,
    pub current_photo: Option<usize>,
}

impl BatchState {
    pub fn new(photo_count: usize) -> Self {
        Self {
            photos: (0..photo_count).map(|_| PhotoState::queued()).collect(),
            total_books_found: 0,
            cancel_requested: false,
            current_photo: None,
        }
    }

    pub fn recompute_total(&mut self) {
        self.total_books_found = self.photos.iter().map(|p| p.books_found).sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_invariant_catches_overrun() {
        let mut job = Job::new("j1", Pipeline::BatchEnrichment, 5, Utc::now());
        job.processed_count = 6;
        assert!(!job.is_consistent());
    }

    #[test]
    fn batch_state_total_tracks_sum() {
        let mut b = BatchState::new(3);
        b.photos[0].books_found = 2;
        b.photos[2].books_found = 5;
        b.recompute_total();
        assert_eq!(b.total_books_found, 7);
    }

    #[test]
    fn token_strict_boundary_is_invalid() {
        let now = Utc::now();
        let token = AuthToken {
            value: "x".into(),
            expires_at: now,
        };
        assert!(!token.is_valid_at(now));
    }
}
