use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::sequence::TrackId;

/// One mixer channel strip, keyed by the track it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelStrip {
    pub volume: f32,
    pub pan: f32,
    pub muted: bool,
    pub soloed: bool,
}

impl Default for ChannelStrip {
    fn default() -> Self {
        Self {
            volume: 0.8,
            pan: 0.0,
            muted: false,
            soloed: false,
        }
    }
}

/// The master strip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterStrip {
    pub volume: f32,
    pub muted: bool,
}

impl Default for MasterStrip {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
        }
    }
}

/// Mixer slice of a composition: per-track channels plus the master strip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MixerState {
    pub channels: HashMap<TrackId, ChannelStrip>,
    pub master: MasterStrip,
}

impl MixerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(&self, track: TrackId) -> Option<&ChannelStrip> {
        self.channels.get(&track)
    }

    /// Get or create the channel strip for a track.
    pub fn channel_mut(&mut self, track: TrackId) -> &mut ChannelStrip {
        self.channels.entry(track).or_default()
    }

    pub fn remove_channel(&mut self, track: TrackId) -> bool {
        self.channels.remove(&track).is_some()
    }

    pub fn any_solo(&self) -> bool {
        self.channels.values().any(|c| c.soloed)
    }

    /// Compute effective mute for a channel, considering solo state.
    pub fn effective_mute(&self, track: TrackId) -> bool {
        let Some(ch) = self.channels.get(&track) else {
            return false;
        };
        if self.any_solo() {
            !ch.soloed
        } else {
            ch.muted
        }
    }
}
