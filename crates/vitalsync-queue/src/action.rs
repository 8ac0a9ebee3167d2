//! Queued action definition and status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a queued action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    /// Waiting to be drained.
    Pending,
    /// Claimed by an active drain.
    InFlight,
    /// Failed at least one attempt (may be retried).
    Failed,
    /// Executed successfully.
    Succeeded,
}

impl Default for ActionStatus {
    fn default() -> Self {
        ActionStatus::Pending
    }
}

/// Routing descriptor and payload handed over by an action producer.
///
/// The payload is opaque to the queue; producers own its shape and must
/// design it so a retried execution is safe (at-least-once delivery).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// Remote endpoint path.
    pub endpoint: String,
    /// HTTP method or verb of the remote operation.
    pub method: String,
    /// Logical service the operation belongs to.
    pub service: String,
    /// Operation body.
    pub payload: serde_json::Value,
}

impl ActionDescriptor {
    /// Create a new descriptor.
    pub fn new(
        endpoint: impl Into<String>,
        method: impl Into<String>,
        service: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
            service: service.into(),
            payload,
        }
    }
}

/// A persisted, replayable client-originated write operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedAction {
    /// Unique action ID, assigned at enqueue time.
    pub id: Uuid,
    /// Remote endpoint path.
    pub endpoint: String,
    /// HTTP method or verb of the remote operation.
    pub method: String,
    /// Logical service the operation belongs to.
    pub service: String,
    /// Operation body, opaque to the queue.
    pub payload: serde_json::Value,
    /// Current status.
    pub status: ActionStatus,
    /// Enqueue time.
    pub created_at: DateTime<Utc>,
    /// Number of prior failed attempts.
    pub retry_count: u32,
    /// Last execution error, if any.
    pub last_error: Option<String>,
}

impl QueuedAction {
    /// Create a new pending action from a producer descriptor.
    pub fn new(descriptor: ActionDescriptor) -> Self {
        Self {
            id: Uuid::new_v4(),
            endpoint: descriptor.endpoint,
            method: descriptor.method,
            service: descriptor.service,
            payload: descriptor.payload,
            status: ActionStatus::Pending,
            created_at: Utc::now(),
            retry_count: 0,
            last_error: None,
        }
    }

    /// Check if the action is still below the retry ceiling.
    pub fn can_retry(&self, max_retries: u32) -> bool {
        self.retry_count < max_retries
    }

    /// Check if the action is eligible for the next drain batch.
    ///
    /// `Pending` actions are always eligible; `Failed` actions only while
    /// below the retry ceiling. `InFlight` actions are never eligible,
    /// which is what prevents a second overlapping batch.
    pub fn is_eligible(&self, max_retries: u32) -> bool {
        match self.status {
            ActionStatus::Pending => true,
            ActionStatus::Failed => self.can_retry(max_retries),
            ActionStatus::InFlight | ActionStatus::Succeeded => false,
        }
    }

    /// Check if the queue still accounts for this action in `size()`.
    pub fn is_outstanding(&self) -> bool {
        matches!(self.status, ActionStatus::Pending | ActionStatus::Failed)
    }
}
