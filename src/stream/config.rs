use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconnect behaviour of the stream client, fixed for the client's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Retry automatically after a transport error (default: true)
    pub auto_reconnect: bool,

    /// Consecutive failed attempts before giving up (default: 5)
    pub max_reconnect_attempts: u32,

    /// Fixed delay before each retry in milliseconds (default: 3000)
    pub reconnect_delay_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            max_reconnect_attempts: 5,
            reconnect_delay_ms: 3000,
        }
    }
}

impl StreamConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}
