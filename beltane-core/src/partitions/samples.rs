use std::collections::HashMap;

use beltane_types::{topic, SampleAssignment, TrackId};

use super::EditContext;
use crate::error::CoreError;

/// Owns the sample assignments, keyed by track.
#[derive(Default)]
pub struct SamplesPartition {
    assignments: HashMap<TrackId, SampleAssignment>,
}

impl SamplesPartition {
    pub fn assignments(&self) -> &HashMap<TrackId, SampleAssignment> {
        &self.assignments
    }

    pub fn assignment(&self, track: TrackId) -> Option<&SampleAssignment> {
        self.assignments.get(&track)
    }

    pub(crate) fn load(&mut self, assignments: HashMap<TrackId, SampleAssignment>) {
        self.assignments = assignments;
    }

    fn persist(&self, ctx: &mut EditContext<'_>) -> Result<(), CoreError> {
        ctx.store.save_samples(ctx.composition, &self.assignments)?;
        Ok(())
    }

    pub fn assign(
        &mut self,
        track: TrackId,
        sample: SampleAssignment,
        ctx: &mut EditContext<'_>,
    ) -> Result<(), CoreError> {
        self.assignments.insert(track, sample);
        self.persist(ctx)?;
        ctx.publish(topic::SAMPLE_ASSIGNMENTS, &self.assignments);
        ctx.mark_dirty();
        Ok(())
    }

    pub fn clear(&mut self, track: TrackId, ctx: &mut EditContext<'_>) -> Result<(), CoreError> {
        if self.assignments.remove(&track).is_none() {
            return Err(CoreError::UnknownTrack(track));
        }
        self.persist(ctx)?;
        ctx.publish(topic::SAMPLE_ASSIGNMENTS, &self.assignments);
        ctx.mark_dirty();
        Ok(())
    }

    pub fn set_gain(
        &mut self,
        track: TrackId,
        gain: f32,
        ctx: &mut EditContext<'_>,
    ) -> Result<(), CoreError> {
        let sample = self
            .assignments
            .get_mut(&track)
            .ok_or(CoreError::UnknownTrack(track))?;
        sample.gain = gain.clamp(0.0, 2.0);
        self.persist(ctx)?;
        ctx.publish(topic::SAMPLE_ASSIGNMENTS, &self.assignments);
        ctx.mark_dirty();
        Ok(())
    }

    pub(crate) fn apply_broadcast(
        &mut self,
        topic_name: &str,
        value: &serde_json::Value,
    ) -> Result<bool, CoreError> {
        if topic_name != topic::SAMPLE_ASSIGNMENTS {
            return Ok(false);
        }
        self.assignments = serde_json::from_value(value.clone())?;
        Ok(true)
    }
}
