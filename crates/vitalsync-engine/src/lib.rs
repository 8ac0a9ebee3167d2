//! # VitalSync Engine
//!
//! Offline synchronization engine for the VitalSync health client.
//!
//! Drains the durable action queue against a pluggable remote executor,
//! driven by two uncoordinated triggers:
//!
//! - a foreground connectivity watcher that fires on offline→online
//!   transitions, debounced to absorb flapping networks
//! - a periodic background wake-up that reports a coarse outcome signal
//!   back to the host scheduling facility
//!
//! Mutual exclusion between the triggers comes entirely from the queue's
//! single-flight batch claim; the engine holds no drain state of its own.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vitalsync_engine::{
//!     BackgroundScheduler, ChannelNetworkMonitor, EngineConfig, ForegroundTrigger, SyncEngine,
//! };
//! use vitalsync_queue::{ActionQueue, QueueConfig};
//!
//! # use vitalsync_engine::{ExecuteError, RemoteExecutor};
//! # use vitalsync_queue::QueuedAction;
//! # struct ApiExecutor;
//! # #[async_trait::async_trait]
//! # impl RemoteExecutor for ApiExecutor {
//! #     async fn execute(&self, _action: &QueuedAction) -> Result<(), ExecuteError> {
//! #         Ok(())
//! #     }
//! # }
//! #[tokio::main]
//! async fn main() {
//!     let config = EngineConfig::default();
//!     let queue = Arc::new(ActionQueue::new(QueueConfig::default()));
//!     let monitor = Arc::new(ChannelNetworkMonitor::new(true));
//!     let engine = Arc::new(SyncEngine::new(queue.clone(), Arc::new(ApiExecutor)));
//!
//!     let trigger = ForegroundTrigger::new(&config, engine.clone(), monitor.clone());
//!     trigger.start().await;
//!
//!     let scheduler = Arc::new(BackgroundScheduler::new(&config, engine, monitor));
//!     scheduler.register();
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod network;
pub mod report;
pub mod scheduler;
pub mod trigger;

pub use config::EngineConfig;
pub use engine::{ItemResult, SyncEngine, SyncResult};
pub use error::ExecuteError;
pub use executor::RemoteExecutor;
pub use network::{ChannelNetworkMonitor, NetworkMonitor};
pub use report::SyncReport;
pub use scheduler::{BackgroundScheduler, RunOutcome};
pub use trigger::{Debouncer, ForegroundTrigger};
