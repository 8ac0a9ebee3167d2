//! Queue errors.

use thiserror::Error;

/// Queue error types.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Action not found.
    #[error("Action not found: {0}")]
    NotFound(String),

    /// Queue is full.
    #[error("Queue is full")]
    QueueFull,

    /// Persistence layer failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Persisted action could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}
