//! Completes approved transmutations once their estimated duration elapses.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::error::EngineError;
use crate::ids::TransmutationId;
use crate::lifecycle::{Actor, LifecycleStore, Transmutation, TransmutationStatus};

type Timers = Arc<Mutex<HashMap<TransmutationId, JoinHandle<()>>>>;

/// One timer per running transmutation. The timer moves IN_PROGRESS to
/// COMPLETED with supervisor capability; cancelling first aborts it.
pub struct CompletionScheduler {
    store: Arc<LifecycleStore>,
    timers: Timers,
}

impl CompletionScheduler {
    pub fn new(store: Arc<LifecycleStore>) -> Self {
        Self {
            store,
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Arms a completion timer for `record`. No-op if one is already armed.
    pub fn schedule(&self, record: &Transmutation) {
        let id = record.id;
        let delay = Duration::from_secs(record.estimated_duration_seconds);

        let mut timers = lock(&self.timers);
        if timers.contains_key(&id) {
            return;
        }

        let store = Arc::clone(&self.store);
        let registry = Arc::clone(&self.timers);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let outcome = store
                .transition_expecting(
                    id,
                    TransmutationStatus::InProgress,
                    TransmutationStatus::Completed,
                    &Actor::supervisor(),
                )
                .await;
            match outcome {
                Ok(_) => tracing::info!(id = id.0, "transmutation completed on schedule"),
                Err(err @ (EngineError::IllegalTransition { .. } | EngineError::NotFound(_))) => {
                    tracing::debug!(id = id.0, error = %err, "scheduled completion skipped");
                }
                Err(err) => tracing::warn!(id = id.0, error = %err, "scheduled completion failed"),
            }
            lock(&registry).remove(&id);
        });
        timers.insert(id, handle);
        tracing::debug!(id = id.0, delay_secs = delay.as_secs(), "completion scheduled");
    }

    /// Aborts the pending timer for `id`, if any.
    pub fn cancel(&self, id: TransmutationId) {
        if let Some(handle) = lock(&self.timers).remove(&id) {
            handle.abort();
            tracing::debug!(id = id.0, "completion timer aborted");
        }
    }

    pub fn pending(&self) -> usize {
        lock(&self.timers).len()
    }
}

impl Drop for CompletionScheduler {
    fn drop(&mut self) {
        for (_, handle) in lock(&self.timers).drain() {
            handle.abort();
        }
    }
}

fn lock(timers: &Timers) -> std::sync::MutexGuard<'_, HashMap<TransmutationId, JoinHandle<()>>> {
    timers.lock().unwrap_or_else(PoisonError::into_inner)
}
