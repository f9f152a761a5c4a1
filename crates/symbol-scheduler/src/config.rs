//! Queue configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the action queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Capacity of the lifecycle event channel.
    /// Slow subscribers lag behind and miss the oldest events.
    /// Defaults to 64.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    64
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
        }
    }
}
