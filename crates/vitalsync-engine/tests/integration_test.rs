//! End-to-end tests wiring the queue, engine, and triggers together.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;

use vitalsync_engine::{
    BackgroundScheduler, ChannelNetworkMonitor, EngineConfig, ExecuteError, ForegroundTrigger,
    RemoteExecutor, RunOutcome, SyncEngine, SyncReport,
};
use vitalsync_queue::{ActionDescriptor, ActionQueue, FileActionStore, QueueConfig, QueuedAction};

/// Executor that records endpoints and fails the scripted ones.
struct RecordingExecutor {
    fail_endpoints: Vec<String>,
    calls: AtomicUsize,
    endpoints: parking_lot::Mutex<Vec<String>>,
}

impl RecordingExecutor {
    fn new() -> Self {
        Self {
            fail_endpoints: Vec::new(),
            calls: AtomicUsize::new(0),
            endpoints: parking_lot::Mutex::new(Vec::new()),
        }
    }

    fn failing(endpoints: &[&str]) -> Self {
        let mut executor = Self::new();
        executor.fail_endpoints = endpoints.iter().map(|e| e.to_string()).collect();
        executor
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn endpoints(&self) -> Vec<String> {
        self.endpoints.lock().clone()
    }
}

#[async_trait]
impl RemoteExecutor for RecordingExecutor {
    async fn execute(&self, action: &QueuedAction) -> Result<(), ExecuteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.endpoints.lock().push(action.endpoint.clone());

        if self.fail_endpoints.contains(&action.endpoint) {
            Err(ExecuteError::Network("connection reset".to_string()))
        } else {
            Ok(())
        }
    }
}

fn descriptor(endpoint: &str) -> ActionDescriptor {
    ActionDescriptor::new(endpoint, "POST", "vitals", json!({ "heart_rate": 61 }))
}

#[tokio::test]
async fn test_connectivity_restore_drains_persisted_queue() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileActionStore::new(temp_dir.path()).await.unwrap());
    let queue = Arc::new(ActionQueue::with_store(QueueConfig::default(), store));

    // Writes queued while offline
    queue.enqueue(descriptor("/v1/vitals")).await.unwrap();
    queue.enqueue(descriptor("/v1/meals")).await.unwrap();
    assert!(queue.storage_footprint().await.unwrap() > 0);

    let executor = Arc::new(RecordingExecutor::new());
    let monitor = Arc::new(ChannelNetworkMonitor::new(false));
    let engine = Arc::new(SyncEngine::new(queue.clone(), executor.clone()));

    let trigger = ForegroundTrigger::new(&EngineConfig::default(), engine, monitor.clone());
    trigger.start().await;

    monitor.set_online(true);
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Replayed in enqueue order, queue drained, footprint reclaimed
    assert_eq!(executor.endpoints(), vec!["/v1/vitals", "/v1/meals"]);
    assert_eq!(queue.size().await.unwrap(), 0);
    assert_eq!(queue.storage_footprint().await.unwrap(), 0);

    trigger.stop().await;
}

#[tokio::test]
async fn test_restart_preserves_unsynced_actions() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = Arc::new(FileActionStore::new(temp_dir.path()).await.unwrap());
        let queue = ActionQueue::with_store(QueueConfig::default(), store);
        queue.enqueue(descriptor("/v1/vitals")).await.unwrap();
        // Process exits before any drain
    }

    let store = Arc::new(FileActionStore::new(temp_dir.path()).await.unwrap());
    let queue = Arc::new(ActionQueue::with_store(QueueConfig::default(), store));
    queue.recover().await.unwrap();

    assert_eq!(queue.size().await.unwrap(), 1);

    let executor = Arc::new(RecordingExecutor::new());
    let engine = SyncEngine::new(queue.clone(), executor.clone());
    let result = engine.process_queue().await;

    assert!(result.success);
    assert_eq!(result.results.len(), 1);
    assert_eq!(executor.endpoints(), vec!["/v1/vitals"]);
    assert_eq!(queue.size().await.unwrap(), 0);
}

#[tokio::test]
async fn test_partial_failure_reports_counts_and_requeues() {
    let queue = Arc::new(ActionQueue::new(QueueConfig::default()));
    for i in 1..=5 {
        queue
            .enqueue(descriptor(&format!("/v1/item/{}", i)))
            .await
            .unwrap();
    }

    let executor = Arc::new(RecordingExecutor::failing(&["/v1/item/2", "/v1/item/4"]));
    let engine = SyncEngine::new(queue.clone(), executor);

    let result = engine.process_queue().await;
    assert!(result.success);
    assert_eq!(result.results.len(), 5);
    assert_eq!(
        result.report(),
        SyncReport::PartialFailure { failed: 2, total: 5 }
    );
    assert_eq!(queue.size().await.unwrap(), 2);

    // A later pass with a healed remote clears the stragglers
    let executor = Arc::new(RecordingExecutor::new());
    let engine = SyncEngine::new(queue.clone(), executor);
    let result = engine.process_queue().await;
    assert_eq!(result.report(), SyncReport::Synced { count: 2 });
    assert_eq!(queue.size().await.unwrap(), 0);
}

#[tokio::test]
async fn test_background_wakeup_respects_connectivity() {
    let queue = Arc::new(ActionQueue::new(QueueConfig::default()));
    queue.enqueue(descriptor("/v1/vitals")).await.unwrap();

    let executor = Arc::new(RecordingExecutor::new());
    let monitor = Arc::new(ChannelNetworkMonitor::new(false));
    let engine = Arc::new(SyncEngine::new(queue.clone(), executor.clone()));
    let scheduler = Arc::new(BackgroundScheduler::new(
        &EngineConfig::default(),
        engine,
        monitor.clone(),
    ));

    // Offline wake-up does nothing
    assert_eq!(scheduler.run_once().await, RunOutcome::RanNothing);
    assert_eq!(executor.calls(), 0);

    // Online wake-up drains
    monitor.set_online(true);
    assert_eq!(scheduler.run_once().await, RunOutcome::RanSomething);
    assert_eq!(executor.calls(), 1);
    assert_eq!(queue.size().await.unwrap(), 0);

    // Nothing left: subsequent wake-ups report no data
    assert_eq!(scheduler.run_once().await, RunOutcome::RanNothing);
}

#[tokio::test]
async fn test_foreground_and_background_share_single_flight() {
    let queue = Arc::new(ActionQueue::new(QueueConfig::default()));
    for i in 0..4 {
        queue
            .enqueue(descriptor(&format!("/v1/item/{}", i)))
            .await
            .unwrap();
    }

    let executor = Arc::new(RecordingExecutor::new());
    let monitor = Arc::new(ChannelNetworkMonitor::new(true));
    let engine = Arc::new(SyncEngine::new(queue.clone(), executor.clone()));
    let scheduler = Arc::new(BackgroundScheduler::new(
        &EngineConfig::default(),
        engine.clone(),
        monitor,
    ));

    // Both trigger paths fire at once; the queue hands the batch to one
    let foreground = tokio::spawn({
        let engine = engine.clone();
        async move { engine.process_queue().await }
    });
    let background = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.run_once().await }
    });

    let (foreground, _background) = (foreground.await.unwrap(), background.await.unwrap());
    assert!(foreground.success);

    // Every action executed exactly once across both paths
    assert_eq!(executor.calls(), 4);
    assert_eq!(queue.size().await.unwrap(), 0);
}
