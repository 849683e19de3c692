use beltane_types::{topic, MixerState, TrackId};

use super::EditContext;
use crate::error::CoreError;

/// Owns the mixer slice: per-track channel strips plus the master strip.
#[derive(Default)]
pub struct MixerPartition {
    state: MixerState,
}

impl MixerPartition {
    pub fn state(&self) -> &MixerState {
        &self.state
    }

    pub(crate) fn load(&mut self, state: MixerState) {
        self.state = state;
    }

    fn persist_channels(&self, ctx: &mut EditContext<'_>) -> Result<(), CoreError> {
        ctx.store.save_mixer(ctx.composition, &self.state)?;
        Ok(())
    }

    pub fn set_channel_volume(
        &mut self,
        track: TrackId,
        volume: f32,
        ctx: &mut EditContext<'_>,
    ) -> Result<(), CoreError> {
        self.state.channel_mut(track).volume = volume.clamp(0.0, 2.0);
        self.persist_channels(ctx)?;
        ctx.publish(topic::MIXER_CHANNELS, &self.state.channels);
        ctx.mark_dirty();
        Ok(())
    }

    pub fn set_channel_pan(
        &mut self,
        track: TrackId,
        pan: f32,
        ctx: &mut EditContext<'_>,
    ) -> Result<(), CoreError> {
        self.state.channel_mut(track).pan = pan.clamp(-1.0, 1.0);
        self.persist_channels(ctx)?;
        ctx.publish(topic::MIXER_CHANNELS, &self.state.channels);
        ctx.mark_dirty();
        Ok(())
    }

    pub fn set_channel_muted(
        &mut self,
        track: TrackId,
        muted: bool,
        ctx: &mut EditContext<'_>,
    ) -> Result<(), CoreError> {
        self.state.channel_mut(track).muted = muted;
        self.persist_channels(ctx)?;
        ctx.publish(topic::MIXER_CHANNELS, &self.state.channels);
        ctx.mark_dirty();
        Ok(())
    }

    pub fn set_channel_soloed(
        &mut self,
        track: TrackId,
        soloed: bool,
        ctx: &mut EditContext<'_>,
    ) -> Result<(), CoreError> {
        self.state.channel_mut(track).soloed = soloed;
        self.persist_channels(ctx)?;
        ctx.publish(topic::MIXER_CHANNELS, &self.state.channels);
        ctx.mark_dirty();
        Ok(())
    }

    pub fn remove_channel(
        &mut self,
        track: TrackId,
        ctx: &mut EditContext<'_>,
    ) -> Result<(), CoreError> {
        if !self.state.remove_channel(track) {
            return Err(CoreError::UnknownTrack(track));
        }
        self.persist_channels(ctx)?;
        ctx.publish(topic::MIXER_CHANNELS, &self.state.channels);
        ctx.mark_dirty();
        Ok(())
    }

    pub fn set_master_volume(
        &mut self,
        volume: f32,
        ctx: &mut EditContext<'_>,
    ) -> Result<(), CoreError> {
        self.state.master.volume = volume.clamp(0.0, 2.0);
        self.persist_channels(ctx)?;
        ctx.publish(topic::MIXER_MASTER, &self.state.master);
        ctx.mark_dirty();
        Ok(())
    }

    pub fn set_master_muted(
        &mut self,
        muted: bool,
        ctx: &mut EditContext<'_>,
    ) -> Result<(), CoreError> {
        self.state.master.muted = muted;
        self.persist_channels(ctx)?;
        ctx.publish(topic::MIXER_MASTER, &self.state.master);
        ctx.mark_dirty();
        Ok(())
    }

    pub(crate) fn apply_broadcast(
        &mut self,
        topic_name: &str,
        value: &serde_json::Value,
    ) -> Result<bool, CoreError> {
        match topic_name {
            topic::MIXER_CHANNELS => {
                self.state.channels = serde_json::from_value(value.clone())?;
                Ok(true)
            }
            topic::MIXER_MASTER => {
                self.state.master = serde_json::from_value(value.clone())?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
