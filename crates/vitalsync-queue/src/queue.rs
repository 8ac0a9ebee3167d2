//! Durable action queue with single-flight drain.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::action::{ActionDescriptor, ActionStatus, QueuedAction};
use crate::config::{FailurePolicy, QueueConfig};
use crate::error::QueueError;
use crate::store::{ActionStore, MemoryActionStore};

/// Status an action goes back to when a drain claim is undone.
fn pre_drain_status(action: &QueuedAction) -> ActionStatus {
    if action.retry_count == 0 {
        ActionStatus::Pending
    } else {
        ActionStatus::Failed
    }
}

/// Durable, ordered queue of pending write operations.
///
/// The queue is the sole serialization point between the foreground and
/// background sync triggers: at most one drain batch is outstanding at a
/// time, across the whole queue. A second [`ActionQueue::drain_batch`]
/// while a batch is unresolved returns an empty batch.
pub struct ActionQueue {
    config: QueueConfig,
    store: Arc<dyn ActionStore>,
    drain_active: AtomicBool,
    in_flight: parking_lot::Mutex<HashSet<Uuid>>,
}

impl ActionQueue {
    /// Create a queue backed by an in-memory store.
    pub fn new(config: QueueConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryActionStore::new()))
    }

    /// Create a queue with a custom store.
    pub fn with_store(config: QueueConfig, store: Arc<dyn ActionStore>) -> Self {
        Self {
            config,
            store,
            drain_active: AtomicBool::new(false),
            in_flight: parking_lot::Mutex::new(HashSet::new()),
        }
    }

    /// Append an action to the tail of the queue.
    ///
    /// A successful return guarantees the action is recoverable after a
    /// process restart.
    pub async fn enqueue(&self, descriptor: ActionDescriptor) -> Result<Uuid, QueueError> {
        if self.config.max_queue_size > 0 {
            let size = self.size().await?;
            if size as u64 >= self.config.max_queue_size {
                return Err(QueueError::QueueFull);
            }
        }

        let action = QueuedAction::new(descriptor);
        let id = action.id;
        self.store.save(&action).await?;

        debug!(
            "Enqueued action {} ({} {} via {})",
            id, action.method, action.endpoint, action.service
        );
        Ok(id)
    }

    /// Count of actions not yet durably succeeded or removed.
    ///
    /// Observability only; never mutates state.
    pub async fn size(&self) -> Result<usize, QueueError> {
        let all = self.store.load_all().await?;
        Ok(all.iter().filter(|a| a.is_outstanding()).count())
    }

    /// Approximate serialized size of the persisted queue, for display.
    pub async fn storage_footprint(&self) -> Result<u64, QueueError> {
        self.store.footprint().await
    }

    /// Whether a drain batch is currently unresolved.
    pub fn is_draining(&self) -> bool {
        self.drain_active.load(Ordering::SeqCst)
    }

    /// Atomically claim all eligible actions and return them in
    /// insertion order.
    ///
    /// While a prior batch still has unresolved actions this returns an
    /// empty batch, never a second overlapping one. The batch resolves
    /// once every claimed action has been passed to
    /// [`ActionQueue::mark_succeeded`] or [`ActionQueue::mark_failed`],
    /// or the drain is abandoned via [`ActionQueue::abort_drain`].
    pub async fn drain_batch(&self) -> Result<Vec<QueuedAction>, QueueError> {
        if self.drain_active.swap(true, Ordering::SeqCst) {
            debug!("Drain already in flight; returning empty batch");
            return Ok(Vec::new());
        }

        match self.claim_eligible().await {
            Ok(batch) => {
                if batch.is_empty() {
                    self.drain_active.store(false, Ordering::SeqCst);
                } else {
                    let mut in_flight = self.in_flight.lock();
                    in_flight.extend(batch.iter().map(|a| a.id));
                    debug!("Claimed {} actions for draining", batch.len());
                }
                Ok(batch)
            }
            Err(e) => {
                self.drain_active.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Mark an action as successfully replayed and remove it.
    pub async fn mark_succeeded(&self, id: &Uuid) -> Result<(), QueueError> {
        self.store.delete(id).await?;
        self.resolve(id);
        debug!("Action {} synced and removed", id);
        Ok(())
    }

    /// Record a failed attempt for an action.
    ///
    /// Increments the retry count and returns the action to the eligible
    /// set, unless the retry ceiling is reached, in which case the
    /// configured [`FailurePolicy`] applies.
    pub async fn mark_failed(&self, id: &Uuid, error: &str) -> Result<(), QueueError> {
        let Some(mut action) = self.store.load(id).await? else {
            self.resolve(id);
            return Err(QueueError::NotFound(id.to_string()));
        };

        action.retry_count += 1;
        action.last_error = Some(error.to_string());
        action.status = ActionStatus::Failed;

        if action.can_retry(self.config.max_retries) {
            self.store.update(&action).await?;
            debug!(
                "Action {} failed (attempt {}): {}",
                id, action.retry_count, error
            );
        } else {
            match self.config.failure_policy {
                FailurePolicy::Retain => {
                    self.store.update(&action).await?;
                    warn!(
                        "Action {} exhausted {} retries; retained for inspection",
                        id, self.config.max_retries
                    );
                }
                FailurePolicy::Discard => {
                    self.store.delete(id).await?;
                    warn!(
                        "Action {} exhausted {} retries; dropped",
                        id, self.config.max_retries
                    );
                }
            }
        }

        self.resolve(id);
        Ok(())
    }

    /// Abandon the active drain, returning unresolved actions to their
    /// pre-drain status without touching retry counts.
    ///
    /// Used when a systemic store error interrupts a batch mid-way.
    /// Returns the number of actions put back.
    pub async fn abort_drain(&self) -> usize {
        let ids: Vec<Uuid> = {
            let mut in_flight = self.in_flight.lock();
            in_flight.drain().collect()
        };

        let mut reverted = 0;
        for id in &ids {
            match self.store.load(id).await {
                Ok(Some(mut action)) if action.status == ActionStatus::InFlight => {
                    action.status = pre_drain_status(&action);
                    match self.store.update(&action).await {
                        Ok(()) => reverted += 1,
                        Err(e) => {
                            warn!("Failed to revert action {} during drain abort: {}", id, e)
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to load action {} during drain abort: {}", id, e),
            }
        }

        self.drain_active.store(false, Ordering::SeqCst);
        if reverted > 0 {
            info!("Aborted drain; {} actions returned to the queue", reverted);
        }
        reverted
    }

    /// Return in-flight leftovers of a crashed process to the eligible set.
    ///
    /// Call once at startup, before the first drain.
    pub async fn recover(&self) -> Result<usize, QueueError> {
        let all = self.store.load_all().await?;
        let mut recovered = 0;

        for mut action in all {
            if action.status == ActionStatus::InFlight {
                action.status = pre_drain_status(&action);
                self.store.update(&action).await?;
                recovered += 1;
            }
        }

        if recovered > 0 {
            info!("Recovered {} in-flight actions from a previous run", recovered);
        }
        Ok(recovered)
    }

    /// Actions that exhausted the retry ceiling and were retained.
    pub async fn exhausted(&self) -> Result<Vec<QueuedAction>, QueueError> {
        let all = self.store.load_all().await?;
        Ok(all
            .into_iter()
            .filter(|a| {
                a.status == ActionStatus::Failed && !a.can_retry(self.config.max_retries)
            })
            .collect())
    }

    /// Claim every eligible action, persisting the in-flight transition.
    async fn claim_eligible(&self) -> Result<Vec<QueuedAction>, QueueError> {
        let all = self.store.load_all().await?;
        let mut batch: Vec<QueuedAction> = all
            .into_iter()
            .filter(|a| a.is_eligible(self.config.max_retries))
            .collect();

        for i in 0..batch.len() {
            batch[i].status = ActionStatus::InFlight;
            if let Err(e) = self.store.update(&batch[i]).await {
                // Undo the partial claim so no action stays stuck in flight
                for action in batch.iter_mut().take(i + 1) {
                    action.status = pre_drain_status(action);
                    if let Err(undo) = self.store.update(action).await {
                        warn!(
                            "Failed to revert action {} after claim error: {}",
                            action.id, undo
                        );
                    }
                }
                return Err(e);
            }
        }

        Ok(batch)
    }

    /// Clear batch membership for a resolved action.
    fn resolve(&self, id: &Uuid) {
        let mut in_flight = self.in_flight.lock();
        if in_flight.remove(id) && in_flight.is_empty() {
            self.drain_active.store(false, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileActionStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn descriptor(endpoint: &str) -> ActionDescriptor {
        ActionDescriptor::new(endpoint, "POST", "vitals", json!({ "reading": 1 }))
    }

    #[tokio::test]
    async fn test_enqueue_and_size() {
        let queue = ActionQueue::new(QueueConfig::default());
        assert_eq!(queue.size().await.unwrap(), 0);

        queue.enqueue(descriptor("/v1/vitals")).await.unwrap();
        queue.enqueue(descriptor("/v1/meals")).await.unwrap();
        assert_eq!(queue.size().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_queue_size_limit() {
        let config = QueueConfig {
            max_queue_size: 2,
            ..Default::default()
        };
        let queue = ActionQueue::new(config);

        queue.enqueue(descriptor("/v1/a")).await.unwrap();
        queue.enqueue(descriptor("/v1/b")).await.unwrap();

        let result = queue.enqueue(descriptor("/v1/c")).await;
        assert!(matches!(result, Err(QueueError::QueueFull)));
    }

    #[tokio::test]
    async fn test_drain_batch_claims_in_order() {
        let queue = ActionQueue::new(QueueConfig::default());
        queue.enqueue(descriptor("/v1/first")).await.unwrap();
        queue.enqueue(descriptor("/v1/second")).await.unwrap();

        let batch = queue.drain_batch().await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].endpoint, "/v1/first");
        assert_eq!(batch[1].endpoint, "/v1/second");
        assert!(batch.iter().all(|a| a.status == ActionStatus::InFlight));

        // In-flight actions no longer count toward size
        assert_eq!(queue.size().await.unwrap(), 0);
        assert!(queue.is_draining());
    }

    #[tokio::test]
    async fn test_drain_batch_single_flight() {
        let queue = ActionQueue::new(QueueConfig::default());
        queue.enqueue(descriptor("/v1/vitals")).await.unwrap();

        let batch = queue.drain_batch().await.unwrap();
        assert_eq!(batch.len(), 1);

        // A second drain while the first is unresolved gets nothing
        let overlapping = queue.drain_batch().await.unwrap();
        assert!(overlapping.is_empty());

        queue.mark_succeeded(&batch[0].id).await.unwrap();
        assert!(!queue.is_draining());
        assert_eq!(queue.size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_failed_requeues() {
        let queue = ActionQueue::new(QueueConfig::default());
        queue.enqueue(descriptor("/v1/vitals")).await.unwrap();

        let batch = queue.drain_batch().await.unwrap();
        queue.mark_failed(&batch[0].id, "503 from remote").await.unwrap();

        assert_eq!(queue.size().await.unwrap(), 1);
        assert!(!queue.is_draining());

        // Failed action is eligible for the next batch
        let next = queue.drain_batch().await.unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].retry_count, 1);
        assert_eq!(next[0].last_error.as_deref(), Some("503 from remote"));
    }

    #[tokio::test]
    async fn test_retry_ceiling_retains() {
        let config = QueueConfig {
            max_retries: 2,
            ..Default::default()
        };
        let queue = ActionQueue::new(config);
        queue.enqueue(descriptor("/v1/vitals")).await.unwrap();

        for _ in 0..2 {
            let batch = queue.drain_batch().await.unwrap();
            assert_eq!(batch.len(), 1);
            queue.mark_failed(&batch[0].id, "boom").await.unwrap();
        }

        // Ceiling reached: retained but no longer drained
        let batch = queue.drain_batch().await.unwrap();
        assert!(batch.is_empty());

        let exhausted = queue.exhausted().await.unwrap();
        assert_eq!(exhausted.len(), 1);
        assert_eq!(exhausted[0].retry_count, 2);
    }

    #[tokio::test]
    async fn test_retry_ceiling_discards() {
        let config = QueueConfig {
            max_retries: 1,
            failure_policy: FailurePolicy::Discard,
            ..Default::default()
        };
        let queue = ActionQueue::new(config);
        queue.enqueue(descriptor("/v1/vitals")).await.unwrap();

        let batch = queue.drain_batch().await.unwrap();
        queue.mark_failed(&batch[0].id, "boom").await.unwrap();

        assert_eq!(queue.size().await.unwrap(), 0);
        assert!(queue.exhausted().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_abort_drain_reverts_batch() {
        let queue = ActionQueue::new(QueueConfig::default());
        queue.enqueue(descriptor("/v1/a")).await.unwrap();
        queue.enqueue(descriptor("/v1/b")).await.unwrap();

        let batch = queue.drain_batch().await.unwrap();
        assert_eq!(batch.len(), 2);

        // Resolve one, abandon the rest
        queue.mark_succeeded(&batch[0].id).await.unwrap();
        let reverted = queue.abort_drain().await;
        assert_eq!(reverted, 1);

        assert!(!queue.is_draining());
        assert_eq!(queue.size().await.unwrap(), 1);

        // The reverted action kept its retry count
        let next = queue.drain_batch().await.unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].retry_count, 0);
        assert_eq!(next[0].status, ActionStatus::InFlight);
    }

    #[tokio::test]
    async fn test_recover_after_crash() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(FileActionStore::new(temp_dir.path()).await.unwrap());

        {
            let queue = ActionQueue::with_store(QueueConfig::default(), store.clone());
            queue.enqueue(descriptor("/v1/vitals")).await.unwrap();
            let batch = queue.drain_batch().await.unwrap();
            assert_eq!(batch.len(), 1);
            // Process dies here with the batch unresolved
        }

        let queue = ActionQueue::with_store(QueueConfig::default(), store);
        assert_eq!(queue.size().await.unwrap(), 0);

        let recovered = queue.recover().await.unwrap();
        assert_eq!(recovered, 1);
        assert_eq!(queue.size().await.unwrap(), 1);

        let batch = queue.drain_batch().await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].retry_count, 0);
    }

    #[tokio::test]
    async fn test_footprint_shrinks_after_drain() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(FileActionStore::new(temp_dir.path()).await.unwrap());
        let queue = ActionQueue::with_store(QueueConfig::default(), store);

        queue.enqueue(descriptor("/v1/vitals")).await.unwrap();
        queue.enqueue(descriptor("/v1/meals")).await.unwrap();
        let before = queue.storage_footprint().await.unwrap();
        assert!(before > 0);

        let batch = queue.drain_batch().await.unwrap();
        for action in &batch {
            queue.mark_succeeded(&action.id).await.unwrap();
        }

        let after = queue.storage_footprint().await.unwrap();
        assert!(after < before);
        assert_eq!(after, 0);
    }
}
