//! Autosave leader election over the broadcast bus.
//!
//! Windows sharing a composition should not all run the autosave timer.
//! Each window with an active composition periodically publishes a claim
//! on the leadership topic; the lowest window id with a live claim is the
//! leader. Claims expire after a few missed heartbeats, so a closed
//! window's leadership fails over to the next-lowest sibling. There is no
//! acknowledgement round: window ids are hub-assigned and totally
//! ordered, so every window reaches the same verdict independently.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;
use serde::{Deserialize, Serialize};

use beltane_sync::{SyncBus, WindowId};
use beltane_types::{topic, CompositionId};

pub const HEARTBEAT: Duration = Duration::from_secs(2);
/// A claim older than this is from a departed or wedged window.
pub const CLAIM_TTL: Duration = Duration::from_secs(6);

/// One window's periodic claim to autosave leadership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderClaim {
    pub window_id: WindowId,
    pub composition: CompositionId,
}

pub struct LeaderElector {
    window_id: WindowId,
    active: Option<CompositionId>,
    last_claim_sent: Option<Instant>,
    /// Latest claim per sibling window.
    peers: HashMap<WindowId, (CompositionId, Instant)>,
}

impl LeaderElector {
    pub fn new(window_id: WindowId) -> Self {
        Self {
            window_id,
            active: None,
            last_claim_sent: None,
            peers: HashMap::new(),
        }
    }

    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    /// Follow the coordinator's active composition. Claims are only made
    /// (and only count) while a composition is active.
    pub fn set_active(&mut self, composition: Option<CompositionId>) {
        if self.active != composition {
            self.active = composition;
            self.last_claim_sent = None;
        }
    }

    /// Absorb a sibling's claim.
    pub fn apply_claim(&mut self, claim: LeaderClaim, now: Instant) {
        if claim.window_id == self.window_id {
            return;
        }
        self.peers.insert(claim.window_id, (claim.composition, now));
    }

    /// Publish our own claim when due and prune expired peers.
    pub fn tick(&mut self, now: Instant, bus: &mut SyncBus) {
        self.peers
            .retain(|_, (_, seen)| now.duration_since(*seen) <= CLAIM_TTL);

        let Some(composition) = self.active else {
            return;
        };
        let due = match self.last_claim_sent {
            None => true,
            Some(last) => now >= last + HEARTBEAT,
        };
        if !due {
            return;
        }
        self.last_claim_sent = Some(now);

        let claim = LeaderClaim {
            window_id: self.window_id,
            composition,
        };
        if let Err(e) = bus.publish(topic::AUTOSAVE_LEADER, &claim) {
            debug!("failed to publish leadership claim: {}", e);
        }
    }

    /// Whether this window currently holds autosave leadership for its
    /// active composition: no live claim from a lower window id exists.
    pub fn is_leader(&self, now: Instant) -> bool {
        let Some(composition) = self.active else {
            return false;
        };
        !self.peers.iter().any(|(window, (claimed, seen))| {
            *claimed == composition
                && now.duration_since(*seen) <= CLAIM_TTL
                && *window < self.window_id
        })
    }
}
