//! Sync client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`SessionClient`](crate::SessionClient).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Delay before reattempting the connection after an unintended
    /// close, in milliseconds (default `3000`).
    pub reconnect_delay_ms: u64,
    /// Capacity of the channel-event queue between the reader task and
    /// the client run loop.
    pub event_buffer: usize,
    /// Capacity of the outbound send queue. A full queue drops the
    /// send (best effort, never blocks).
    pub send_buffer: usize,
}

impl SyncConfig {
    /// The reconnect delay as a [`Duration`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: 3_000,
            event_buffer: 256,
            send_buffer: 64,
        }
    }
}
