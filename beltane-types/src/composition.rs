use serde::{Deserialize, Serialize};

/// Unique identifier for a composition, minted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompositionId(pub i64);

impl CompositionId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for CompositionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata for one composition, as listed by the store.
///
/// `track_count` and `clip_count` are derived from the live rows at read
/// time; they are never written directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionMeta {
    pub id: CompositionId,
    pub name: String,
    pub tempo: f32,
    pub time_signature: (u8, u8),
    pub created_at: String,
    pub updated_at: String,
    pub track_count: u32,
    pub clip_count: u32,
}

/// Partial metadata update applied through the coordinator's update path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompositionPatch {
    pub name: Option<String>,
    pub tempo: Option<f32>,
    pub time_signature: Option<(u8, u8)>,
}

impl CompositionPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.tempo.is_none() && self.time_signature.is_none()
    }
}

/// One entry in a composition's version history, newest first as listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: i64,
    pub created_at: String,
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_is_empty() {
        assert!(CompositionPatch::default().is_empty());
        let patch = CompositionPatch {
            tempo: Some(128.0),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
