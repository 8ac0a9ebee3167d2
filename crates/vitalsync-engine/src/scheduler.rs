//! Background wake-up scheduling.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine::SyncEngine;
use crate::network::NetworkMonitor;

/// Coarse signal reported back to the host scheduling facility.
///
/// The host uses it to tune future wake-up cadence; it is never a proxy
/// for per-item success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// At least one queued action existed and was attempted.
    RanSomething,
    /// The queue was empty or connectivity was unavailable.
    RanNothing,
}

/// Periodic background drain of the action queue.
///
/// `register` starts exactly one in-process wake-up loop; hosts whose
/// operating system owns background execution instead call
/// [`BackgroundScheduler::run_once`] from their periodic callback and
/// relay the returned [`RunOutcome`].
pub struct BackgroundScheduler {
    engine: Arc<SyncEngine>,
    monitor: Arc<dyn NetworkMonitor>,
    interval: Duration,
    running: AtomicBool,
}

impl BackgroundScheduler {
    /// Create a new scheduler.
    pub fn new(
        config: &EngineConfig,
        engine: Arc<SyncEngine>,
        monitor: Arc<dyn NetworkMonitor>,
    ) -> Self {
        Self {
            engine,
            monitor,
            interval: config.background_interval(),
            running: AtomicBool::new(false),
        }
    }

    /// Nominal wake-up interval. The actual cadence belongs to the host.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check if the periodic task is registered.
    pub fn is_registered(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Register the periodic wake-up loop. Re-registration is a no-op.
    pub fn register(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("Background sync task already registered");
            return;
        }

        let this = self.clone();
        tokio::spawn(async move {
            info!(
                "Background sync task registered (interval={}s)",
                this.interval.as_secs()
            );

            while this.running.load(Ordering::SeqCst) {
                tokio::time::sleep(this.interval).await;
                if !this.running.load(Ordering::SeqCst) {
                    break;
                }

                let outcome = this.run_once().await;
                debug!("Background wake-up finished: {:?}", outcome);
            }

            info!("Background sync task cancelled");
        });
    }

    /// Cancel the periodic wake-up loop.
    pub fn cancel(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Body of one background wake-up.
    ///
    /// Checks connectivity and queue size before draining, and maps the
    /// richer sync result down to the host facility's two-value signal.
    pub async fn run_once(&self) -> RunOutcome {
        if !self.monitor.is_online() {
            debug!("Background wake-up while offline; nothing to do");
            return RunOutcome::RanNothing;
        }

        let size = match self.engine.queue().size().await {
            Ok(size) => size,
            Err(e) => {
                warn!("Background wake-up could not read queue size: {}", e);
                return RunOutcome::RanNothing;
            }
        };
        if size == 0 {
            debug!("Background wake-up with empty queue; nothing to do");
            return RunOutcome::RanNothing;
        }

        let result = self.engine.process_queue().await;
        if result.results.is_empty() {
            RunOutcome::RanNothing
        } else {
            RunOutcome::RanSomething
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
