use std::collections::HashMap;

use beltane_types::{topic, EffectChain, EffectKind, TrackId};

use super::EditContext;
use crate::error::CoreError;

/// Owns the effect chains, keyed by track.
#[derive(Default)]
pub struct EffectsPartition {
    chains: HashMap<TrackId, EffectChain>,
}

impl EffectsPartition {
    pub fn chains(&self) -> &HashMap<TrackId, EffectChain> {
        &self.chains
    }

    pub fn chain(&self, track: TrackId) -> Option<&EffectChain> {
        self.chains.get(&track)
    }

    pub(crate) fn load(&mut self, mut chains: HashMap<TrackId, EffectChain>) {
        for chain in chains.values_mut() {
            chain.recompute_next_unit_id();
        }
        self.chains = chains;
    }

    fn persist(&self, ctx: &mut EditContext<'_>) -> Result<(), CoreError> {
        ctx.store.save_effects(ctx.composition, &self.chains)?;
        Ok(())
    }

    pub fn add_effect(
        &mut self,
        track: TrackId,
        kind: EffectKind,
        ctx: &mut EditContext<'_>,
    ) -> Result<u32, CoreError> {
        let unit = self.chains.entry(track).or_default().add_unit(kind);
        self.persist(ctx)?;
        ctx.publish(topic::EFFECT_CHAINS, &self.chains);
        ctx.mark_dirty();
        Ok(unit)
    }

    pub fn remove_effect(
        &mut self,
        track: TrackId,
        unit: u32,
        ctx: &mut EditContext<'_>,
    ) -> Result<(), CoreError> {
        let chain = self
            .chains
            .get_mut(&track)
            .ok_or(CoreError::UnknownTrack(track))?;
        if !chain.remove_unit(unit) {
            return Err(CoreError::UnknownEffect(track, unit));
        }
        self.persist(ctx)?;
        ctx.publish(topic::EFFECT_CHAINS, &self.chains);
        ctx.mark_dirty();
        Ok(())
    }

    pub fn set_effect_enabled(
        &mut self,
        track: TrackId,
        unit: u32,
        enabled: bool,
        ctx: &mut EditContext<'_>,
    ) -> Result<(), CoreError> {
        let u = self
            .chains
            .get_mut(&track)
            .ok_or(CoreError::UnknownTrack(track))?
            .unit_mut(unit)
            .ok_or(CoreError::UnknownEffect(track, unit))?;
        u.enabled = enabled;
        self.persist(ctx)?;
        ctx.publish(topic::EFFECT_CHAINS, &self.chains);
        ctx.mark_dirty();
        Ok(())
    }

    pub fn set_effect_param(
        &mut self,
        track: TrackId,
        unit: u32,
        name: &str,
        value: f32,
        ctx: &mut EditContext<'_>,
    ) -> Result<(), CoreError> {
        let u = self
            .chains
            .get_mut(&track)
            .ok_or(CoreError::UnknownTrack(track))?
            .unit_mut(unit)
            .ok_or(CoreError::UnknownEffect(track, unit))?;
        u.params.insert(name.to_string(), value);
        self.persist(ctx)?;
        ctx.publish(topic::EFFECT_CHAINS, &self.chains);
        ctx.mark_dirty();
        Ok(())
    }

    /// Replace a whole chain (drag-and-drop of a preset chain).
    pub fn set_chain(
        &mut self,
        track: TrackId,
        chain: EffectChain,
        ctx: &mut EditContext<'_>,
    ) -> Result<(), CoreError> {
        let mut chain = chain;
        chain.recompute_next_unit_id();
        self.chains.insert(track, chain);
        self.persist(ctx)?;
        ctx.publish(topic::EFFECT_CHAINS, &self.chains);
        ctx.mark_dirty();
        Ok(())
    }

    pub(crate) fn apply_broadcast(
        &mut self,
        topic_name: &str,
        value: &serde_json::Value,
    ) -> Result<bool, CoreError> {
        if topic_name != topic::EFFECT_CHAINS {
            return Ok(false);
        }
        let mut chains: HashMap<TrackId, EffectChain> = serde_json::from_value(value.clone())?;
        for chain in chains.values_mut() {
            chain.recompute_next_unit_id();
        }
        self.chains = chains;
        Ok(true)
    }
}
