use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;
use crate::mixer::MixerState;
use crate::samples::SampleAssignment;
use crate::sequence::{SequenceDoc, TrackId};

/// The complete transferable state of a composition, as returned by a load.
///
/// Consumed exactly once per load: the distributor fans the fields out to
/// the domain partitions and the snapshot is not retained afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositionSnapshot {
    pub sequence: SequenceDoc,
    pub mixer: MixerState,
    pub effects: HashMap<TrackId, crate::effects::EffectChain>,
    pub samples: HashMap<TrackId, SampleAssignment>,
    #[serde(default)]
    pub chat: Vec<ChatMessage>,
}
