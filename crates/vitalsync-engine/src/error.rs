//! Engine errors.

use thiserror::Error;

/// Error returned by a remote executor for a single action.
///
/// Executor errors never escape [`crate::engine::SyncEngine`] as `Err`;
/// their message becomes [`crate::engine::ItemResult::error`] data.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// The remote service could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// The remote service rejected the action.
    #[error("Remote rejected action: {0}")]
    Rejected(String),

    /// Anything else the executor wants to report.
    #[error("{0}")]
    Other(String),
}
