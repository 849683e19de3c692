//! Broadcast topic names shared by all windows.
//!
//! Every topic carries an authoritative replacement of its value, never a
//! delta; the last publish wins.

/// All sequencer tracks (with clips), as `Vec<Track>`.
pub const SEQUENCER_TRACKS: &str = "sequencer.tracks";

/// Transport/view settings, as `TransportSettings`.
pub const SEQUENCER_TRANSPORT: &str = "sequencer.transport";

/// All channel strips, as `HashMap<TrackId, ChannelStrip>`.
pub const MIXER_CHANNELS: &str = "mixer.channels";

/// The master strip, as `MasterStrip`.
pub const MIXER_MASTER: &str = "mixer.master";

/// All effect chains, as `HashMap<TrackId, EffectChain>`.
pub const EFFECT_CHAINS: &str = "effects.chains";

/// All sample assignments, as `HashMap<TrackId, SampleAssignment>`.
pub const SAMPLE_ASSIGNMENTS: &str = "samples.sampleAssignments";

/// Composition metadata after an update, as `CompositionMeta`.
pub const COMPOSITION_META: &str = "composition.meta";

/// Notice that a window saved the composition, as `SavedNotice`.
pub const COMPOSITION_SAVED: &str = "composition.saved";

/// Autosave leadership claims, as `LeaderClaim`.
pub const AUTOSAVE_LEADER: &str = "autosave.leader";

/// Topics whose payloads are domain mutations: receiving one means the
/// window's in-memory state now differs from what it last saved.
pub const DOMAIN_TOPICS: &[&str] = &[
    SEQUENCER_TRACKS,
    SEQUENCER_TRANSPORT,
    MIXER_CHANNELS,
    MIXER_MASTER,
    EFFECT_CHAINS,
    SAMPLE_ASSIGNMENTS,
];
