use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::queue::Phase;

/// How submissions have ended up, since the queue was built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub panicked: u64,
    pub cancelled: u64,
}

impl QueueCounts {
    /// Submissions that have reached a ticket result.
    pub fn settled(&self) -> u64 {
        self.succeeded + self.failed + self.panicked + self.cancelled
    }
}

/// Point-in-time view of a queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub phase: Phase,
    pub pending: usize,
    pub delay_ms: u64,
    pub break_requested: bool,
    pub runs_completed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_idle_at: Option<DateTime<Utc>>,
    pub counts: QueueCounts,
}
