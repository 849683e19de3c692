use beltane_types::{topic, ClipId, SequenceDoc, Track, TrackId, TransportSettings};

use super::EditContext;
use crate::error::CoreError;

/// Owns the sequence document: tracks, clips, transport settings.
///
/// Track ids minted here key every other partition's rows, which is why
/// the distributor loads this partition first.
#[derive(Default)]
pub struct SequencerPartition {
    doc: SequenceDoc,
}

impl SequencerPartition {
    pub fn doc(&self) -> &SequenceDoc {
        &self.doc
    }

    /// Replace the whole slice from a distributed snapshot.
    pub(crate) fn load(&mut self, mut doc: SequenceDoc) {
        doc.recompute_next_ids();
        self.doc = doc;
    }

    pub fn add_track(
        &mut self,
        name: &str,
        ctx: &mut EditContext<'_>,
    ) -> Result<TrackId, CoreError> {
        let id = self.doc.add_track(name);
        ctx.store.save_sequence(ctx.composition, &self.doc)?;
        ctx.publish(topic::SEQUENCER_TRACKS, &self.doc.tracks);
        ctx.mark_dirty();
        Ok(id)
    }

    pub fn remove_track(
        &mut self,
        id: TrackId,
        ctx: &mut EditContext<'_>,
    ) -> Result<(), CoreError> {
        if !self.doc.remove_track(id) {
            return Err(CoreError::UnknownTrack(id));
        }
        ctx.store.save_sequence(ctx.composition, &self.doc)?;
        ctx.publish(topic::SEQUENCER_TRACKS, &self.doc.tracks);
        ctx.mark_dirty();
        Ok(())
    }

    pub fn add_clip(
        &mut self,
        track: TrackId,
        start_tick: u32,
        length_ticks: u32,
        ctx: &mut EditContext<'_>,
    ) -> Result<ClipId, CoreError> {
        let clip = self
            .doc
            .add_clip(track, start_tick, length_ticks)
            .ok_or(CoreError::UnknownTrack(track))?;
        ctx.store.save_sequence(ctx.composition, &self.doc)?;
        ctx.publish(topic::SEQUENCER_TRACKS, &self.doc.tracks);
        ctx.mark_dirty();
        Ok(clip)
    }

    pub fn set_track_muted(
        &mut self,
        track: TrackId,
        muted: bool,
        ctx: &mut EditContext<'_>,
    ) -> Result<(), CoreError> {
        let t = self
            .doc
            .track_mut(track)
            .ok_or(CoreError::UnknownTrack(track))?;
        t.muted = muted;
        ctx.store.save_sequence(ctx.composition, &self.doc)?;
        ctx.publish(topic::SEQUENCER_TRACKS, &self.doc.tracks);
        ctx.mark_dirty();
        Ok(())
    }

    /// Transport tweaks are low-stakes and frequent, so this publishes
    /// optimistically before the store write.
    pub fn set_transport(
        &mut self,
        transport: TransportSettings,
        ctx: &mut EditContext<'_>,
    ) -> Result<(), CoreError> {
        self.doc.transport = transport;
        ctx.publish(topic::SEQUENCER_TRANSPORT, &self.doc.transport);
        ctx.store.save_sequence(ctx.composition, &self.doc)?;
        ctx.mark_dirty();
        Ok(())
    }

    pub(crate) fn apply_broadcast(
        &mut self,
        topic_name: &str,
        value: &serde_json::Value,
    ) -> Result<bool, CoreError> {
        match topic_name {
            topic::SEQUENCER_TRACKS => {
                let tracks: Vec<Track> = serde_json::from_value(value.clone())?;
                self.doc.tracks = tracks;
                self.doc.recompute_next_ids();
                Ok(true)
            }
            topic::SEQUENCER_TRANSPORT => {
                self.doc.transport = serde_json::from_value(value.clone())?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
