//! Shared data model for the Beltane composition editor.
//!
//! Pure serde types with no I/O: composition metadata, the transferable
//! snapshot, the four domain slices (sequence, mixer, effects, samples),
//! and the broadcast topic names all windows agree on.

pub mod chat;
pub mod composition;
pub mod effects;
pub mod mixer;
pub mod samples;
pub mod sequence;
pub mod snapshot;
pub mod topic;

pub use chat::ChatMessage;
pub use composition::{CompositionId, CompositionMeta, CompositionPatch, VersionEntry};
pub use effects::{EffectChain, EffectKind, EffectUnit};
pub use mixer::{ChannelStrip, MasterStrip, MixerState};
pub use samples::SampleAssignment;
pub use sequence::{Clip, ClipId, NoteEvent, SequenceDoc, Track, TrackId, TransportSettings};
pub use snapshot::CompositionSnapshot;
