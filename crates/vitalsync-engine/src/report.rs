//! User-facing sync outcome mapping.

use serde::{Deserialize, Serialize};

use crate::engine::SyncResult;

/// Coarse user-visible outcome of a sync pass.
///
/// Hosts map these onto toast/banner copy. Raw error strings stay in
/// [`SyncResult`]; a partial failure surfaces only the failed count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncReport {
    /// Nothing was queued, or another drain already had the batch.
    NothingToSync,
    /// Every queued action was replayed.
    Synced {
        /// Number of actions synced.
        count: usize,
    },
    /// Some actions failed and remain queued for a future attempt.
    PartialFailure {
        /// Number of failed actions.
        failed: usize,
        /// Batch size.
        total: usize,
    },
    /// A systemic error interrupted the pass; items remain queued.
    SyncFailed,
}

impl SyncResult {
    /// Summarize this result for user feedback.
    pub fn report(&self) -> SyncReport {
        if !self.success {
            return SyncReport::SyncFailed;
        }
        if self.results.is_empty() {
            return SyncReport::NothingToSync;
        }

        let failed = self.failed_items();
        if failed == 0 {
            SyncReport::Synced {
                count: self.results.len(),
            }
        } else {
            SyncReport::PartialFailure {
                failed,
                total: self.results.len(),
            }
        }
    }
}
