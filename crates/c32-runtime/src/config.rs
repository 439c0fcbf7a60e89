//! Scheduler configuration.

use core::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Lower bound of the outer loop sleep. Never 0, so the loop never spins.
    pub min_sleep_ms: u64,
    /// Upper bound of the outer loop sleep.
    pub max_sleep_ms: u64,
    /// Per-task command queue capacity.
    pub command_queue_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_sleep_ms: 1,
            max_sleep_ms: 100,
            command_queue_capacity: 32,
        }
    }
}

impl SchedulerConfig {
    pub fn min_sleep(&self) -> Duration {
        Duration::from_millis(self.min_sleep_ms)
    }

    pub fn max_sleep(&self) -> Duration {
        Duration::from_millis(self.max_sleep_ms)
    }
}
