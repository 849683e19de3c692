//! Relational writers: replace a composition's live rows, one slice at a time.
//!
//! Each writer deletes the slice's rows and re-inserts from the in-memory
//! value, so every write is an authoritative replacement, the same
//! semantics the broadcast bus gives a topic.

use std::collections::HashMap;

use rusqlite::{params, Connection, Result as SqlResult};

use beltane_types::{
    ChatMessage, CompositionId, CompositionSnapshot, EffectChain, MixerState, SampleAssignment,
    SequenceDoc, TrackId,
};

pub fn replace_sequence(conn: &Connection, id: CompositionId, doc: &SequenceDoc) -> SqlResult<()> {
    let cid = id.get();
    conn.execute("DELETE FROM tracks WHERE composition_id = ?1", [cid])?;
    conn.execute("DELETE FROM clips WHERE composition_id = ?1", [cid])?;
    conn.execute("DELETE FROM clip_notes WHERE composition_id = ?1", [cid])?;

    let mut track_stmt = conn.prepare(
        "INSERT INTO tracks (composition_id, id, name, position, muted, soloed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    let mut clip_stmt = conn.prepare(
        "INSERT INTO clips (composition_id, id, track_id, start_tick, length_ticks)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    let mut note_stmt = conn.prepare(
        "INSERT INTO clip_notes (composition_id, clip_id, position, tick, pitch, velocity, length_ticks)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;

    for track in &doc.tracks {
        track_stmt.execute(params![
            cid,
            track.id.get() as i64,
            track.name,
            track.position,
            track.muted,
            track.soloed,
        ])?;
        for clip in &track.clips {
            clip_stmt.execute(params![
                cid,
                clip.id.get() as i64,
                track.id.get() as i64,
                clip.start_tick,
                clip.length_ticks,
            ])?;
            for (pos, note) in clip.notes.iter().enumerate() {
                note_stmt.execute(params![
                    cid,
                    clip.id.get() as i64,
                    pos as i64,
                    note.tick,
                    note.pitch,
                    note.velocity,
                    note.length_ticks,
                ])?;
            }
        }
    }

    conn.execute(
        "INSERT OR REPLACE INTO transport_settings
         (composition_id, loop_enabled, loop_start_tick, loop_end_tick, metronome, swing)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            cid,
            doc.transport.loop_enabled,
            doc.transport.loop_start_tick,
            doc.transport.loop_end_tick,
            doc.transport.metronome,
            doc.transport.swing,
        ],
    )?;

    Ok(())
}

pub fn replace_mixer(conn: &Connection, id: CompositionId, mixer: &MixerState) -> SqlResult<()> {
    let cid = id.get();
    conn.execute("DELETE FROM mixer_channels WHERE composition_id = ?1", [cid])?;

    let mut stmt = conn.prepare(
        "INSERT INTO mixer_channels (composition_id, track_id, volume, pan, muted, soloed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for (track, ch) in &mixer.channels {
        stmt.execute(params![
            cid,
            track.get() as i64,
            ch.volume,
            ch.pan,
            ch.muted,
            ch.soloed,
        ])?;
    }

    conn.execute(
        "INSERT OR REPLACE INTO mixer_master (composition_id, volume, muted) VALUES (?1, ?2, ?3)",
        params![cid, mixer.master.volume, mixer.master.muted],
    )?;

    Ok(())
}

pub fn replace_effects(
    conn: &Connection,
    id: CompositionId,
    effects: &HashMap<TrackId, EffectChain>,
) -> SqlResult<()> {
    let cid = id.get();
    conn.execute("DELETE FROM effect_units WHERE composition_id = ?1", [cid])?;
    conn.execute("DELETE FROM effect_params WHERE composition_id = ?1", [cid])?;

    let mut unit_stmt = conn.prepare(
        "INSERT INTO effect_units (composition_id, track_id, id, position, kind, enabled)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    let mut param_stmt = conn.prepare(
        "INSERT INTO effect_params (composition_id, track_id, unit_id, name, value)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;

    for (track, chain) in effects {
        for (pos, unit) in chain.units.iter().enumerate() {
            unit_stmt.execute(params![
                cid,
                track.get() as i64,
                unit.id,
                pos as i64,
                format!("{:?}", unit.kind),
                unit.enabled,
            ])?;
            for (name, value) in &unit.params {
                param_stmt.execute(params![cid, track.get() as i64, unit.id, name, value])?;
            }
        }
    }

    Ok(())
}

pub fn replace_samples(
    conn: &Connection,
    id: CompositionId,
    samples: &HashMap<TrackId, SampleAssignment>,
) -> SqlResult<()> {
    let cid = id.get();
    conn.execute("DELETE FROM sample_assignments WHERE composition_id = ?1", [cid])?;

    let mut stmt = conn.prepare(
        "INSERT INTO sample_assignments
         (composition_id, track_id, sample_id, name, gain, root_note)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for (track, sample) in samples {
        stmt.execute(params![
            cid,
            track.get() as i64,
            sample.sample_id,
            sample.name,
            sample.gain,
            sample.root_note,
        ])?;
    }

    Ok(())
}

pub fn replace_chat(conn: &Connection, id: CompositionId, chat: &[ChatMessage]) -> SqlResult<()> {
    let cid = id.get();
    conn.execute("DELETE FROM chat_messages WHERE composition_id = ?1", [cid])?;

    let mut stmt = conn.prepare(
        "INSERT INTO chat_messages (composition_id, position, author, body, sent_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (pos, msg) in chat.iter().enumerate() {
        stmt.execute(params![cid, pos as i64, msg.author, msg.body, msg.sent_at])?;
    }

    Ok(())
}

/// Replace every live slice of a composition from a snapshot.
pub fn replace_all(conn: &Connection, id: CompositionId, snapshot: &CompositionSnapshot) -> SqlResult<()> {
    replace_sequence(conn, id, &snapshot.sequence)?;
    replace_mixer(conn, id, &snapshot.mixer)?;
    replace_effects(conn, id, &snapshot.effects)?;
    replace_samples(conn, id, &snapshot.samples)?;
    replace_chat(conn, id, &snapshot.chat)?;
    Ok(())
}

/// Delete every row belonging to a composition, including history and the
/// autosave slot.
pub fn delete_all(conn: &Connection, id: CompositionId) -> SqlResult<()> {
    let cid = id.get();
    for table in [
        "tracks",
        "clips",
        "clip_notes",
        "transport_settings",
        "mixer_channels",
        "mixer_master",
        "effect_units",
        "effect_params",
        "sample_assignments",
        "chat_messages",
        "history",
        "autosaves",
    ] {
        conn.execute(
            &format!("DELETE FROM {} WHERE composition_id = ?1", table),
            [cid],
        )?;
    }
    conn.execute("DELETE FROM compositions WHERE id = ?1", [cid])?;
    Ok(())
}
