//! Remote executor seam.

use async_trait::async_trait;

use vitalsync_queue::QueuedAction;

use crate::error::ExecuteError;

/// Remote execution boundary.
///
/// Implementations replay a queued action against the remote service.
/// Delivery is at-least-once: a retried execution of the same action must
/// be safe, either because the remote tolerates duplicates or because the
/// producer designed the payload that way.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Replay one queued action.
    async fn execute(&self, action: &QueuedAction) -> Result<(), ExecuteError>;
}
