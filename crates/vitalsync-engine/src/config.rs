//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Floor for the background wake-up interval.
const MIN_BACKGROUND_INTERVAL_SECS: u64 = 60;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Suppression window for the foreground trigger debounce, in
    /// milliseconds.
    #[serde(default = "default_debounce_window_ms")]
    pub debounce_window_ms: u64,

    /// Nominal interval between background wake-ups, in seconds. The
    /// host scheduler treats this as a minimum hint, not a guarantee.
    #[serde(default = "default_background_interval_secs")]
    pub background_interval_secs: u64,
}

fn default_debounce_window_ms() -> u64 {
    1_000
}

fn default_background_interval_secs() -> u64 {
    900
}

impl EngineConfig {
    /// Debounce window as a [`Duration`].
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    /// Background interval as a [`Duration`], clamped to the floor.
    pub fn background_interval(&self) -> Duration {
        Duration::from_secs(self.background_interval_secs.max(MIN_BACKGROUND_INTERVAL_SECS))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_window_ms: default_debounce_window_ms(),
            background_interval_secs: default_background_interval_secs(),
        }
    }
}
