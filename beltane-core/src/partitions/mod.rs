//! Domain state partitions: sequencer, mixer, effects, samples.
//!
//! Each partition owns one slice of the active composition. Mutators apply
//! the change locally, persist the slice through the store's
//! partition-local write, announce the new value on the bus, and notify
//! the dirty tracker. `apply_broadcast` absorbs a sibling window's
//! published value without re-issuing any store call.

mod effects;
mod mixer;
mod samples;
mod sequencer;

pub use effects::EffectsPartition;
pub use mixer::MixerPartition;
pub use samples::SamplesPartition;
pub use sequencer::SequencerPartition;

use log::warn;
use serde::Serialize;

use beltane_store::ProjectStore;
use beltane_sync::SyncBus;
use beltane_types::CompositionId;

use crate::dirty::DirtyTracker;
use crate::error::CoreError;

/// Everything a partition mutator needs besides its own state.
pub struct EditContext<'a> {
    pub store: &'a dyn ProjectStore,
    pub bus: &'a mut SyncBus,
    pub dirty: &'a DirtyTracker,
    pub composition: CompositionId,
}

impl EditContext<'_> {
    /// Announce a topic's new value to sibling windows. Fire-and-forget:
    /// the local mutation and the store write have already happened, so a
    /// bus failure is logged rather than unwinding the edit.
    pub fn publish<T: Serialize>(&mut self, topic: &str, value: &T) {
        if let Err(e) = self.bus.publish(topic, value) {
            warn!("failed to publish {}: {}", topic, e);
        }
    }

    pub fn mark_dirty(&self) {
        self.dirty.notify_changed();
    }
}

/// The four partitions of one window.
#[derive(Default)]
pub struct PartitionSet {
    pub sequencer: SequencerPartition,
    pub mixer: MixerPartition,
    pub effects: EffectsPartition,
    pub samples: SamplesPartition,
}

impl PartitionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every partition to empty defaults (no composition active).
    pub fn reset_all(&mut self) {
        *self = Self::default();
    }

    /// Route a broadcast to the partition owning its topic. Returns true
    /// if the topic belonged to a partition and was absorbed.
    pub fn apply_broadcast(
        &mut self,
        topic: &str,
        value: serde_json::Value,
    ) -> Result<bool, CoreError> {
        if self.sequencer.apply_broadcast(topic, &value)? {
            return Ok(true);
        }
        if self.mixer.apply_broadcast(topic, &value)? {
            return Ok(true);
        }
        if self.effects.apply_broadcast(topic, &value)? {
            return Ok(true);
        }
        if self.samples.apply_broadcast(topic, &value)? {
            return Ok(true);
        }
        Ok(false)
    }
}
