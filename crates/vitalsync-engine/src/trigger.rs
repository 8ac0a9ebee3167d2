//! Foreground connectivity trigger with leading-edge debounce.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine::SyncEngine;
use crate::network::NetworkMonitor;

/// Leading-edge debounce gate.
///
/// The first call in a burst passes; later calls within the suppression
/// window are dropped rather than deferred. Purely a timing concern,
/// kept separate from the engine's own logic.
pub struct Debouncer {
    window: Duration,
    last_fired: parking_lot::Mutex<Option<Instant>>,
}

impl Debouncer {
    /// Create a debouncer with the given suppression window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: parking_lot::Mutex::new(None),
        }
    }

    /// Whether the caller may fire now. Firing arms the window.
    pub fn should_fire(&self) -> bool {
        let mut last = self.last_fired.lock();
        let now = Instant::now();

        match *last {
            Some(prev) if now.duration_since(prev) < self.window => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

/// Drains the queue when connectivity comes back.
///
/// Tracks the monitor's state and invokes the engine on each
/// offline→online transition, debounced to absorb flapping connectivity.
/// Going offline never triggers a drain.
pub struct ForegroundTrigger {
    engine: Arc<SyncEngine>,
    monitor: Arc<dyn NetworkMonitor>,
    debouncer: Arc<Debouncer>,
    enabled: AtomicBool,
    shutdown: RwLock<Option<mpsc::Sender<()>>>,
}

impl ForegroundTrigger {
    /// Create a new trigger.
    pub fn new(
        config: &EngineConfig,
        engine: Arc<SyncEngine>,
        monitor: Arc<dyn NetworkMonitor>,
    ) -> Self {
        Self {
            engine,
            monitor,
            debouncer: Arc::new(Debouncer::new(config.debounce_window())),
            enabled: AtomicBool::new(false),
            shutdown: RwLock::new(None),
        }
    }

    /// Check if the trigger is running.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Start watching connectivity. Starting twice is a no-op.
    pub async fn start(&self) {
        {
            let mut guard = self.shutdown.write().await;
            if guard.is_some() {
                warn!("Foreground trigger is already running");
                return;
            }

            let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
            *guard = Some(shutdown_tx);

            let rx = self.monitor.subscribe();
            let was_online = self.monitor.is_online();
            spawn_status_watcher(
                self.engine.clone(),
                self.debouncer.clone(),
                rx,
                was_online,
                shutdown_rx,
            );
        }

        self.enabled.store(true, Ordering::SeqCst);
        info!("Foreground trigger started");
    }

    /// Stop watching connectivity.
    pub async fn stop(&self) {
        self.enabled.store(false, Ordering::SeqCst);

        {
            let mut guard = self.shutdown.write().await;
            if let Some(tx) = guard.take() {
                let _ = tx.send(()).await;
            }
        }

        info!("Foreground trigger stopped");
    }
}

/// Spawn the task consuming connectivity changes.
fn spawn_status_watcher(
    engine: Arc<SyncEngine>,
    debouncer: Arc<Debouncer>,
    mut rx: tokio::sync::watch::Receiver<bool>,
    mut was_online: bool,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Foreground trigger shutting down");
                    break;
                }
                changed = rx.changed() => {
                    if changed.is_err() {
                        // Monitor dropped; no more status changes will come
                        debug!("Network monitor closed; foreground trigger exiting");
                        break;
                    }

                    let online = *rx.borrow_and_update();
                    let came_online = !was_online && online;
                    was_online = online;

                    if !came_online {
                        continue;
                    }

                    if !debouncer.should_fire() {
                        debug!("Connectivity flap suppressed by debounce");
                        continue;
                    }

                    debug!("Connectivity restored; draining queue");
                    let result = engine.process_queue().await;
                    if !result.success {
                        warn!(
                            "Foreground sync failed: {}",
                            result.error.as_deref().unwrap_or("unknown error")
                        );
                    }
                }
            }
        }
    });
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
