//! The Registry: `jobId -> SessionHandle`, one live Session per id (§4.F).
//!
//! Mirrors the teacher's "Core owns state exclusively, handles are cheap clones" split
//! one level up: the Registry's own critical section is limited to the get-or-spawn
//! decision, never held across a Session's own async work.

use std::collections::HashMap;
use std::sync::Arc;

use shelfscribe_storage::CheckpointStore;
use tokio::sync::Mutex;

use crate::alarm::AlarmHandler;
use crate::handle::SessionHandle;

pub struct Registry {
    storage: Arc<dyn CheckpointStore>,
    alarm_handler: Option<Arc<dyn AlarmHandler>>,
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl Registry {
    pub fn new(storage: Arc<dyn CheckpointStore>, alarm_handler: Option<Arc<dyn AlarmHandler>>) -> Self {
        Self {
            storage,
            alarm_handler,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Return the live Session for `job_id`, constructing (and restoring from storage)
    /// one if this is the first caller to ask for it.
    pub async fn get(&self, job_id: &str) -> SessionHandle {
        let mut sessions = self.sessions.lock().await;
        if let Some(handle) = sessions.get(job_id) {
            if !handle.is_gone() {
                return handle.clone();
            }
        }
        let handle = SessionHandle::spawn(job_id.to_string(), self.storage.clone(), self.alarm_handler.clone()).await;
        sessions.insert(job_id.to_string(), handle.clone());
        handle
    }

    /// Drop the Registry's reference to a Session. The actor task itself ends once its
    /// last `SessionHandle` (and its `mpsc::Sender`) is dropped; storage persists
    /// independently of the task's lifetime.
    pub async fn evict(&self, job_id: &str) {
        self.sessions.lock().await.remove(job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfscribe_storage::MemoryCheckpointStore;

    #[tokio::test]
    async fn concurrent_get_yields_same_session() {
        let registry = Registry::new(Arc::new(MemoryCheckpointStore::new()), None);
        let a = registry.get("J1").await;
        let b = registry.get("J1").await;
        a.set_auth_token("tok".into(), std::time::Duration::from_secs(60)).await.unwrap();
        let (job, auth) = b.get_job_state_and_auth().await.unwrap();
        assert!(job.is_none());
        assert_eq!(auth.unwrap().value, "tok");
    }
}
