use serde::{Deserialize, Serialize};

/// A sample assigned to a track from the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleAssignment {
    /// Stable library identifier for the sample.
    pub sample_id: String,
    pub name: String,
    pub gain: f32,
    /// MIDI note the sample plays back at original pitch.
    pub root_note: u8,
}

impl SampleAssignment {
    pub fn new(sample_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            sample_id: sample_id.into(),
            name: name.into(),
            gain: 1.0,
            root_note: 60,
        }
    }
}
