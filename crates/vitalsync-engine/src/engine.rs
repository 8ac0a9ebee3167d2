//! Sync engine draining the action queue against a remote executor.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use vitalsync_queue::{ActionQueue, QueueError};

use crate::executor::RemoteExecutor;

/// Outcome of replaying one queued action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemResult {
    /// Action ID.
    pub id: Uuid,
    /// Whether the remote executor accepted the action.
    pub success: bool,
    /// Executor error message for failed items.
    pub error: Option<String>,
}

impl ItemResult {
    fn ok(id: Uuid) -> Self {
        Self {
            id,
            success: true,
            error: None,
        }
    }

    fn failed(id: Uuid, error: String) -> Self {
        Self {
            id,
            success: false,
            error: Some(error),
        }
    }
}

/// Aggregate outcome of one [`SyncEngine::process_queue`] pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    /// False only when a systemic error (store unavailable or corrupt)
    /// interrupted the pass. Individual item failures leave this true and
    /// are reported through `results`.
    pub success: bool,
    /// Per-item outcomes, in replay order.
    pub results: Vec<ItemResult>,
    /// Systemic error message, if any.
    pub error: Option<String>,
}

impl SyncResult {
    fn completed(results: Vec<ItemResult>) -> Self {
        Self {
            success: true,
            results,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            results: Vec::new(),
            error: Some(error),
        }
    }

    /// Number of items the executor rejected in this pass.
    pub fn failed_items(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }
}

/// Drains the durable queue against a remote executor.
///
/// The engine itself holds no drain state: mutual exclusion between the
/// foreground and background triggers comes entirely from the queue's
/// single-flight batch claim.
pub struct SyncEngine {
    queue: Arc<ActionQueue>,
    executor: Arc<dyn RemoteExecutor>,
}

impl SyncEngine {
    /// Create a new engine.
    pub fn new(queue: Arc<ActionQueue>, executor: Arc<dyn RemoteExecutor>) -> Self {
        Self { queue, executor }
    }

    /// The queue this engine drains.
    pub fn queue(&self) -> &Arc<ActionQueue> {
        &self.queue
    }

    /// Drain all eligible queued actions, strictly in order.
    ///
    /// An empty queue, or a drain suppressed because another one is in
    /// flight, is a no-op success. A single item's failure marks it for
    /// retry and processing continues; only systemic store errors abort
    /// the pass.
    pub async fn process_queue(&self) -> SyncResult {
        match self.drain().await {
            Ok(results) => SyncResult::completed(results),
            Err(e) => {
                error!("Sync pass aborted: {}", e);
                SyncResult::failed(e.to_string())
            }
        }
    }

    async fn drain(&self) -> Result<Vec<ItemResult>, QueueError> {
        if self.queue.size().await? == 0 {
            debug!("Queue empty; nothing to sync");
            return Ok(Vec::new());
        }

        let batch = self.queue.drain_batch().await?;
        if batch.is_empty() {
            debug!("Drain already in flight; nothing to do right now");
            return Ok(Vec::new());
        }

        info!("Syncing {} queued actions", batch.len());
        let mut results = Vec::with_capacity(batch.len());

        for action in &batch {
            match self.executor.execute(action).await {
                Ok(()) => {
                    if let Err(e) = self.queue.mark_succeeded(&action.id).await {
                        self.queue.abort_drain().await;
                        return Err(e);
                    }
                    results.push(ItemResult::ok(action.id));
                }
                Err(err) => {
                    warn!("Action {} failed at the executor: {}", action.id, err);
                    if let Err(e) = self.queue.mark_failed(&action.id, &err.to_string()).await {
                        self.queue.abort_drain().await;
                        return Err(e);
                    }
                    results.push(ItemResult::failed(action.id, err.to_string()));
                }
            }
        }

        let failed = results.iter().filter(|r| !r.success).count();
        if failed > 0 {
            info!(
                "Sync pass finished: {} of {} actions failed and remain queued",
                failed,
                results.len()
            );
        } else {
            info!("Sync pass finished: {} actions synced", results.len());
        }

        Ok(results)
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
