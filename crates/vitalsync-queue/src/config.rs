//! Queue configuration.

use serde::{Deserialize, Serialize};

/// Disposition of actions that exhaust the retry ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Keep the action in the store in terminal failed state for inspection.
    Retain,
    /// Delete the action from the store once the ceiling is reached.
    Discard,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Retain
    }
}

/// Queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum failed attempts before an action leaves the eligible set.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Maximum queue size (0 = unlimited).
    #[serde(default)]
    pub max_queue_size: u64,

    /// What happens to actions that exhaust the retry ceiling.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_max_retries() -> u32 {
    5
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            max_queue_size: 0,
            failure_policy: FailurePolicy::default(),
        }
    }
}
