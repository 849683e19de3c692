//! Wire protocol for hub/window communication.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Unique identifier for a connected window, assigned by the hub.
///
/// Monotonically increasing across the hub's lifetime, so it doubles as a
/// stable tie-breaker (lowest id wins autosave leadership).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl WindowId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// A delivered publish: the topic and its authoritative new value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Broadcast {
    pub topic: String,
    pub value: Value,
    /// The window that published this value.
    pub origin: WindowId,
}

/// Messages sent from a window to the hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HubMessage {
    /// Initial handshake with a human-readable window name.
    Hello { window_name: String },
    /// Fire-and-forget publish; relayed to every other window.
    Publish { topic: String, value: Value },
    /// Keepalive ping.
    Ping,
    /// Clean detach.
    Bye,
}

/// Messages sent from the hub to a window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WindowMessage {
    /// Handshake completion with the window's assigned ID.
    Welcome { window_id: WindowId },
    /// A publish from another window.
    Broadcast(Broadcast),
    /// Response to Ping.
    Pong,
    /// Hub is shutting down.
    Shutdown,
}
