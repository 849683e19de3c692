use serde::{Deserialize, Serialize};

/// Unique identifier for a track within a composition.
///
/// Minted by the sequencer partition; mixer channels, effect chains and
/// sample assignments are all keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub u64);

impl TrackId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a clip within a composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipId(pub u64);

impl ClipId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// A single note event inside a clip. Ticks are relative to clip start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub tick: u32,
    pub pitch: u8,
    pub velocity: u8,
    pub length_ticks: u32,
}

/// A clip placed on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: ClipId,
    pub start_tick: u32,
    pub length_ticks: u32,
    #[serde(default)]
    pub notes: Vec<NoteEvent>,
}

/// A sequencer track. Clips live inline; everything else about the track
/// (channel strip, effect chain, sample) is owned by its own partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub position: u32,
    pub muted: bool,
    pub soloed: bool,
    #[serde(default)]
    pub clips: Vec<Clip>,
}

impl Track {
    pub fn new(id: TrackId, name: impl Into<String>, position: u32) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            muted: false,
            soloed: false,
            clips: Vec::new(),
        }
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn clip_mut(&mut self, id: ClipId) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == id)
    }
}

/// Transport and view settings shared across a composition's windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportSettings {
    pub loop_enabled: bool,
    pub loop_start_tick: u32,
    pub loop_end_tick: u32,
    pub metronome: bool,
    pub swing: f32,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            loop_enabled: false,
            loop_start_tick: 0,
            loop_end_tick: 0,
            metronome: false,
            swing: 0.0,
        }
    }
}

/// The sequencer's slice of a composition: tracks (with clips) plus
/// transport settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceDoc {
    pub tracks: Vec<Track>,
    /// Next track ID to assign (never reused, always increments).
    #[serde(skip)]
    pub next_track_id: u64,
    /// Next clip ID to assign (never reused, always increments).
    #[serde(skip)]
    pub next_clip_id: u64,
    #[serde(default)]
    pub transport: TransportSettings,
}

impl SequenceDoc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    pub fn track_ids(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.tracks.iter().map(|t| t.id)
    }

    pub fn clip_count(&self) -> usize {
        self.tracks.iter().map(|t| t.clips.len()).sum()
    }

    /// Add a new track at the end. Returns the new track's ID.
    pub fn add_track(&mut self, name: impl Into<String>) -> TrackId {
        let id = TrackId::new(self.next_track_id);
        self.next_track_id += 1;
        let position = self.tracks.len() as u32;
        self.tracks.push(Track::new(id, name, position));
        id
    }

    /// Remove a track by ID. Returns true if found and removed.
    pub fn remove_track(&mut self, id: TrackId) -> bool {
        if let Some(idx) = self.tracks.iter().position(|t| t.id == id) {
            self.tracks.remove(idx);
            for (pos, track) in self.tracks.iter_mut().enumerate() {
                track.position = pos as u32;
            }
            true
        } else {
            false
        }
    }

    /// Add a clip to a track. Returns the new clip's ID, or None if the
    /// track does not exist.
    pub fn add_clip(&mut self, track: TrackId, start_tick: u32, length_ticks: u32) -> Option<ClipId> {
        let idx = self.tracks.iter().position(|t| t.id == track)?;
        let id = ClipId::new(self.next_clip_id);
        self.next_clip_id += 1;
        self.tracks[idx].clips.push(Clip {
            id,
            start_tick,
            length_ticks,
            notes: Vec::new(),
        });
        Some(id)
    }

    /// Recompute next IDs from loaded rows (IDs are not persisted).
    pub fn recompute_next_ids(&mut self) {
        self.next_track_id = self
            .tracks
            .iter()
            .map(|t| t.id.get())
            .max()
            .map_or(0, |m| m + 1);
        self.next_clip_id = self
            .tracks
            .iter()
            .flat_map(|t| t.clips.iter().map(|c| c.id.get()))
            .max()
            .map_or(0, |m| m + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_track_increments_id() {
        let mut doc = SequenceDoc::new();
        let a = doc.add_track("Kick");
        let b = doc.add_track("Snare");
        assert_eq!(a, TrackId::new(0));
        assert_eq!(b, TrackId::new(1));
        assert_eq!(doc.tracks.len(), 2);
        assert_eq!(doc.track(b).unwrap().position, 1);
    }

    #[test]
    fn remove_track_renumbers_positions() {
        let mut doc = SequenceDoc::new();
        let a = doc.add_track("Kick");
        let b = doc.add_track("Snare");
        let c = doc.add_track("Hat");
        assert!(doc.remove_track(b));
        assert_eq!(doc.track(a).unwrap().position, 0);
        assert_eq!(doc.track(c).unwrap().position, 1);
        // IDs are never reused
        assert_eq!(doc.add_track("Clap"), TrackId::new(3));
    }

    #[test]
    fn add_clip_to_missing_track() {
        let mut doc = SequenceDoc::new();
        assert!(doc.add_clip(TrackId::new(7), 0, 16).is_none());
        // A failed add must not consume an ID
        let t = doc.add_track("Kick");
        assert_eq!(doc.add_clip(t, 0, 16), Some(ClipId::new(0)));
    }

    #[test]
    fn recompute_next_ids_after_load() {
        let mut doc = SequenceDoc::new();
        let t = doc.add_track("Kick");
        doc.add_clip(t, 0, 16);
        doc.add_clip(t, 16, 16);
        doc.next_track_id = 0;
        doc.next_clip_id = 0;
        doc.recompute_next_ids();
        assert_eq!(doc.next_track_id, 1);
        assert_eq!(doc.next_clip_id, 2);
    }

    #[test]
    fn clip_count_spans_tracks() {
        let mut doc = SequenceDoc::new();
        let a = doc.add_track("Kick");
        let b = doc.add_track("Snare");
        doc.add_clip(a, 0, 16);
        doc.add_clip(b, 0, 16);
        doc.add_clip(b, 16, 16);
        assert_eq!(doc.clip_count(), 3);
    }
}
