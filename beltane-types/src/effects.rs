use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The effect types a chain slot can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    Reverb,
    Delay,
    Chorus,
    Distortion,
    Compressor,
    Eq,
    Filter,
}

impl EffectKind {
    pub fn display_name(self) -> &'static str {
        match self {
            EffectKind::Reverb => "Reverb",
            EffectKind::Delay => "Delay",
            EffectKind::Chorus => "Chorus",
            EffectKind::Distortion => "Distortion",
            EffectKind::Compressor => "Compressor",
            EffectKind::Eq => "EQ",
            EffectKind::Filter => "Filter",
        }
    }
}

/// One effect in a chain, with its named parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectUnit {
    pub id: u32,
    pub kind: EffectKind,
    pub enabled: bool,
    #[serde(default)]
    pub params: HashMap<String, f32>,
}

impl EffectUnit {
    pub fn new(id: u32, kind: EffectKind) -> Self {
        Self {
            id,
            kind,
            enabled: true,
            params: HashMap::new(),
        }
    }
}

/// An ordered effect chain for one track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectChain {
    pub units: Vec<EffectUnit>,
    /// Next unit ID to assign (never reused).
    #[serde(skip)]
    pub next_unit_id: u32,
}

impl EffectChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unit(&self, id: u32) -> Option<&EffectUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn unit_mut(&mut self, id: u32) -> Option<&mut EffectUnit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    /// Append a new effect. Returns the new unit's ID.
    pub fn add_unit(&mut self, kind: EffectKind) -> u32 {
        let id = self.next_unit_id;
        self.next_unit_id += 1;
        self.units.push(EffectUnit::new(id, kind));
        id
    }

    /// Remove a unit by ID. Returns true if found and removed.
    pub fn remove_unit(&mut self, id: u32) -> bool {
        if let Some(idx) = self.units.iter().position(|u| u.id == id) {
            self.units.remove(idx);
            true
        } else {
            false
        }
    }

    /// Recompute next_unit_id from loaded rows.
    pub fn recompute_next_unit_id(&mut self) {
        self.next_unit_id = self.units.iter().map(|u| u.id).max().map_or(0, |m| m + 1);
    }
}
