//! Snapshot fan-out to the domain partitions.
//!
//! Distribution is all-or-nothing: every slice is validated against the
//! staged sequence before any partition is touched, so a bad snapshot
//! leaves the previous state fully intact. Commit order is fixed, with
//! the sequencer first, because mixer channels, effect chains and sample
//! assignments are keyed by track ids the sequence document mints.

use std::collections::HashSet;

use beltane_types::{CompositionSnapshot, TrackId};

use crate::error::CoreError;
use crate::partitions::PartitionSet;

/// Validate a snapshot and commit it into the partitions.
///
/// The snapshot is consumed: ownership of each field transfers to its
/// partition and the whole is never retained.
pub fn distribute(
    partitions: &mut PartitionSet,
    snapshot: CompositionSnapshot,
) -> Result<(), CoreError> {
    let track_ids: HashSet<TrackId> = snapshot.sequence.track_ids().collect();

    check_refs(&track_ids, snapshot.mixer.channels.keys(), "mixer channel")?;
    check_refs(&track_ids, snapshot.effects.keys(), "effect chain")?;
    check_refs(&track_ids, snapshot.samples.keys(), "sample assignment")?;

    partitions.sequencer.load(snapshot.sequence);
    partitions.mixer.load(snapshot.mixer);
    partitions.effects.load(snapshot.effects);
    partitions.samples.load(snapshot.samples);

    Ok(())
}

fn check_refs<'a>(
    track_ids: &HashSet<TrackId>,
    referenced: impl Iterator<Item = &'a TrackId>,
    what: &str,
) -> Result<(), CoreError> {
    for track in referenced {
        if !track_ids.contains(track) {
            return Err(CoreError::Load(format!(
                "{} references unknown track {}",
                what, track
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beltane_types::{MixerState, SampleAssignment, SequenceDoc};

    fn snapshot_with_tracks() -> CompositionSnapshot {
        let mut doc = SequenceDoc::new();
        let kick = doc.add_track("Kick");
        doc.add_clip(kick, 0, 16);
        let mut mixer = MixerState::new();
        mixer.channel_mut(kick).volume = 0.6;
        let mut snapshot = CompositionSnapshot {
            sequence: doc,
            mixer,
            ..Default::default()
        };
        snapshot
            .samples
            .insert(kick, SampleAssignment::new("lib:kick", "Kick"));
        snapshot
    }

    #[test]
    fn valid_snapshot_commits_all_slices() {
        let mut parts = PartitionSet::new();
        distribute(&mut parts, snapshot_with_tracks()).unwrap();

        assert_eq!(parts.sequencer.doc().tracks.len(), 1);
        assert_eq!(parts.mixer.state().channels.len(), 1);
        assert_eq!(parts.samples.assignments().len(), 1);
    }

    #[test]
    fn unknown_track_fails_without_touching_partitions() {
        let mut parts = PartitionSet::new();
        distribute(&mut parts, snapshot_with_tracks()).unwrap();

        // A snapshot whose mixer references a track the sequence never
        // minted must be rejected wholesale.
        let mut bad = CompositionSnapshot::default();
        bad.sequence.add_track("Only track");
        bad.mixer.channel_mut(TrackId::new(99));

        let err = distribute(&mut parts, bad).unwrap_err();
        assert!(matches!(err, CoreError::Load(_)));

        // Previous state intact, not half-replaced.
        assert_eq!(parts.sequencer.doc().tracks[0].name, "Kick");
        assert_eq!(parts.mixer.state().channels.len(), 1);
        assert_eq!(parts.samples.assignments().len(), 1);
    }

    #[test]
    fn load_resets_minted_id_counters() {
        let mut parts = PartitionSet::new();
        distribute(&mut parts, snapshot_with_tracks()).unwrap();
        // next ids recomputed from loaded rows, not carried over
        assert_eq!(parts.sequencer.doc().next_track_id, 1);
        assert_eq!(parts.sequencer.doc().next_clip_id, 1);
    }
}
