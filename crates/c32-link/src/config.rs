//! Link configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Inbound messages buffered between the transport and the dispatcher.
    pub inbound_capacity: usize,
    /// Longer inbound messages are dropped.
    pub max_message_len: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            inbound_capacity: 32,
            max_message_len: 4096,
        }
    }
}
