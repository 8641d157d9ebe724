//! Shared store of submitted jobs and their cancel flags. The runner (see
//! [`super::runner`]) is handed a clone of the registry and is responsible
//! for removing its own cancel flag on every exit path (completed, failed,
//! or cancelled) so a stale flag never leaks.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::job::{BacktestJob, SubmitRequest};

#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<BTreeMap<Uuid, BacktestJob>>>,
    cancel_flags: Arc<RwLock<BTreeMap<Uuid, Arc<AtomicBool>>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn submit(&self, request: SubmitRequest) -> Uuid {
        let id = Uuid::new_v4();
        let job = BacktestJob::new(id, request);
        self.jobs.write().await.insert(id, job);
        self.cancel_flags
            .write()
            .await
            .insert(id, Arc::new(AtomicBool::new(false)));
        id
    }

    /// Requests cancellation of an in-flight job. Returns `false` if the job
    /// is not currently in flight (already terminal, or unknown).
    pub async fn request_cancel(&self, id: Uuid) -> bool {
        if let Some(flag) = self.cancel_flags.read().await.get(&id) {
            flag.store(true, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    pub async fn cancel_flag(&self, id: Uuid) -> Option<Arc<AtomicBool>> {
        self.cancel_flags.read().await.get(&id).cloned()
    }

    pub async fn get(&self, id: Uuid) -> Option<BacktestJob> {
        self.jobs.read().await.get(&id).cloned()
    }

    pub async fn update<F: FnOnce(&mut BacktestJob)>(&self, id: Uuid, f: F) {
        if let Some(job) = self.jobs.write().await.get_mut(&id) {
            f(job);
        }
    }

    /// Drops the cancel flag for `id`. Must be called on every exit path of
    /// a running job so the in-flight set never outlives the job itself.
    pub async fn remove_in_flight(&self, id: Uuid) {
        self.cancel_flags.write().await.remove(&id);
    }

    pub async fn is_in_flight(&self, id: Uuid) -> bool {
        self.cancel_flags.read().await.contains_key(&id)
    }
}
