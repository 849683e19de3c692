//! Relational readers: composition metadata and full snapshots.

use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};

use beltane_types::{
    ChatMessage, ChannelStrip, Clip, ClipId, CompositionId, CompositionMeta, CompositionSnapshot,
    EffectChain, EffectKind, EffectUnit, MasterStrip, MixerState, NoteEvent, SampleAssignment,
    SequenceDoc, Track, TrackId, TransportSettings,
};

const META_COLUMNS: &str = "c.id, c.name, c.tempo, c.time_sig_num, c.time_sig_denom,
     c.created_at, c.updated_at,
     (SELECT COUNT(*) FROM tracks t WHERE t.composition_id = c.id),
     (SELECT COUNT(*) FROM clips p WHERE p.composition_id = c.id)";

fn meta_from_row(row: &rusqlite::Row<'_>) -> SqlResult<CompositionMeta> {
    Ok(CompositionMeta {
        id: CompositionId::new(row.get(0)?),
        name: row.get(1)?,
        tempo: row.get(2)?,
        time_signature: (row.get::<_, i64>(3)? as u8, row.get::<_, i64>(4)? as u8),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        track_count: row.get::<_, i64>(7)? as u32,
        clip_count: row.get::<_, i64>(8)? as u32,
    })
}

/// Metadata for one composition, or None if it does not exist.
pub fn read_meta(conn: &Connection, id: CompositionId) -> SqlResult<Option<CompositionMeta>> {
    conn.query_row(
        &format!("SELECT {} FROM compositions c WHERE c.id = ?1", META_COLUMNS),
        [id.get()],
        meta_from_row,
    )
    .optional()
}

/// All compositions, oldest first (creation order).
pub fn list_metas(conn: &Connection) -> SqlResult<Vec<CompositionMeta>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM compositions c ORDER BY c.id",
        META_COLUMNS
    ))?;
    let rows = stmt.query_map([], meta_from_row)?;

    let mut metas = Vec::new();
    for row in rows {
        metas.push(row?);
    }
    Ok(metas)
}

fn parse_effect_kind(s: &str) -> Option<EffectKind> {
    match s {
        "Reverb" => Some(EffectKind::Reverb),
        "Delay" => Some(EffectKind::Delay),
        "Chorus" => Some(EffectKind::Chorus),
        "Distortion" => Some(EffectKind::Distortion),
        "Compressor" => Some(EffectKind::Compressor),
        "Eq" => Some(EffectKind::Eq),
        "Filter" => Some(EffectKind::Filter),
        _ => None,
    }
}

fn load_sequence(conn: &Connection, cid: i64) -> SqlResult<SequenceDoc> {
    let mut doc = SequenceDoc::new();

    let mut track_stmt = conn.prepare(
        "SELECT id, name, position, muted, soloed FROM tracks
         WHERE composition_id = ?1 ORDER BY position",
    )?;
    let tracks = track_stmt.query_map([cid], |row| {
        Ok(Track {
            id: TrackId::new(row.get::<_, i64>(0)? as u64),
            name: row.get(1)?,
            position: row.get(2)?,
            muted: row.get(3)?,
            soloed: row.get(4)?,
            clips: Vec::new(),
        })
    })?;
    for track in tracks {
        doc.tracks.push(track?);
    }

    let mut clip_stmt = conn.prepare(
        "SELECT id, track_id, start_tick, length_ticks FROM clips
         WHERE composition_id = ?1 ORDER BY id",
    )?;
    let clips = clip_stmt.query_map([cid], |row| {
        Ok((
            row.get::<_, i64>(1)? as u64,
            Clip {
                id: ClipId::new(row.get::<_, i64>(0)? as u64),
                start_tick: row.get(2)?,
                length_ticks: row.get(3)?,
                notes: Vec::new(),
            },
        ))
    })?;
    let mut clips_by_id: Vec<(u64, Clip)> = Vec::new();
    for clip in clips {
        clips_by_id.push(clip?);
    }

    let mut note_stmt = conn.prepare(
        "SELECT clip_id, tick, pitch, velocity, length_ticks FROM clip_notes
         WHERE composition_id = ?1 ORDER BY clip_id, position",
    )?;
    let notes = note_stmt.query_map([cid], |row| {
        Ok((
            row.get::<_, i64>(0)? as u64,
            NoteEvent {
                tick: row.get(1)?,
                pitch: row.get::<_, i64>(2)? as u8,
                velocity: row.get::<_, i64>(3)? as u8,
                length_ticks: row.get(4)?,
            },
        ))
    })?;
    for note in notes {
        let (clip_id, event) = note?;
        if let Some((_, clip)) = clips_by_id.iter_mut().find(|(_, c)| c.id.get() == clip_id) {
            clip.notes.push(event);
        }
    }

    for (track_id, clip) in clips_by_id {
        if let Some(track) = doc.track_mut(TrackId::new(track_id)) {
            track.clips.push(clip);
        }
    }

    let transport = conn
        .query_row(
            "SELECT loop_enabled, loop_start_tick, loop_end_tick, metronome, swing
             FROM transport_settings WHERE composition_id = ?1",
            [cid],
            |row| {
                Ok(TransportSettings {
                    loop_enabled: row.get(0)?,
                    loop_start_tick: row.get(1)?,
                    loop_end_tick: row.get(2)?,
                    metronome: row.get(3)?,
                    swing: row.get(4)?,
                })
            },
        )
        .optional()?;
    doc.transport = transport.unwrap_or_default();

    doc.recompute_next_ids();
    Ok(doc)
}

fn load_mixer(conn: &Connection, cid: i64) -> SqlResult<MixerState> {
    let mut mixer = MixerState::new();

    let mut stmt = conn.prepare(
        "SELECT track_id, volume, pan, muted, soloed FROM mixer_channels
         WHERE composition_id = ?1",
    )?;
    let rows = stmt.query_map([cid], |row| {
        Ok((
            TrackId::new(row.get::<_, i64>(0)? as u64),
            ChannelStrip {
                volume: row.get(1)?,
                pan: row.get(2)?,
                muted: row.get(3)?,
                soloed: row.get(4)?,
            },
        ))
    })?;
    for row in rows {
        let (track, strip) = row?;
        mixer.channels.insert(track, strip);
    }

    let master = conn
        .query_row(
            "SELECT volume, muted FROM mixer_master WHERE composition_id = ?1",
            [cid],
            |row| {
                Ok(MasterStrip {
                    volume: row.get(0)?,
                    muted: row.get(1)?,
                })
            },
        )
        .optional()?;
    mixer.master = master.unwrap_or_default();

    Ok(mixer)
}

fn load_effects(conn: &Connection, cid: i64) -> SqlResult<HashMap<TrackId, EffectChain>> {
    let mut chains: HashMap<TrackId, EffectChain> = HashMap::new();

    let mut unit_stmt = conn.prepare(
        "SELECT track_id, id, kind, enabled FROM effect_units
         WHERE composition_id = ?1 ORDER BY track_id, position",
    )?;
    let units = unit_stmt.query_map([cid], |row| {
        Ok((
            TrackId::new(row.get::<_, i64>(0)? as u64),
            row.get::<_, u32>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, bool>(3)?,
        ))
    })?;
    for unit in units {
        let (track, unit_id, kind, enabled) = unit?;
        let Some(kind) = parse_effect_kind(&kind) else {
            log::warn!("skipping unknown effect kind '{}' on track {}", kind, track);
            continue;
        };
        let chain = chains.entry(track).or_default();
        chain.units.push(EffectUnit {
            id: unit_id,
            kind,
            enabled,
            params: HashMap::new(),
        });
    }

    let mut param_stmt = conn.prepare(
        "SELECT track_id, unit_id, name, value FROM effect_params WHERE composition_id = ?1",
    )?;
    let param_rows = param_stmt.query_map([cid], |row| {
        Ok((
            TrackId::new(row.get::<_, i64>(0)? as u64),
            row.get::<_, u32>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, f32>(3)?,
        ))
    })?;
    for row in param_rows {
        let (track, unit_id, name, value) = row?;
        if let Some(unit) = chains.get_mut(&track).and_then(|c| c.unit_mut(unit_id)) {
            unit.params.insert(name, value);
        }
    }

    for chain in chains.values_mut() {
        chain.recompute_next_unit_id();
    }

    Ok(chains)
}

fn load_samples(conn: &Connection, cid: i64) -> SqlResult<HashMap<TrackId, SampleAssignment>> {
    let mut samples = HashMap::new();

    let mut stmt = conn.prepare(
        "SELECT track_id, sample_id, name, gain, root_note FROM sample_assignments
         WHERE composition_id = ?1",
    )?;
    let rows = stmt.query_map([cid], |row| {
        Ok((
            TrackId::new(row.get::<_, i64>(0)? as u64),
            SampleAssignment {
                sample_id: row.get(1)?,
                name: row.get(2)?,
                gain: row.get(3)?,
                root_note: row.get::<_, i64>(4)? as u8,
            },
        ))
    })?;
    for row in rows {
        let (track, sample) = row?;
        samples.insert(track, sample);
    }

    Ok(samples)
}

fn load_chat(conn: &Connection, cid: i64) -> SqlResult<Vec<ChatMessage>> {
    let mut stmt = conn.prepare(
        "SELECT author, body, sent_at FROM chat_messages
         WHERE composition_id = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map([cid], |row| {
        Ok(ChatMessage {
            author: row.get(0)?,
            body: row.get(1)?,
            sent_at: row.get(2)?,
        })
    })?;

    let mut chat = Vec::new();
    for row in rows {
        chat.push(row?);
    }
    Ok(chat)
}

/// Assemble the full snapshot of a composition from its live rows.
pub fn load_snapshot(conn: &Connection, id: CompositionId) -> SqlResult<CompositionSnapshot> {
    let cid = id.get();
    Ok(CompositionSnapshot {
        sequence: load_sequence(conn, cid)?,
        mixer: load_mixer(conn, cid)?,
        effects: load_effects(conn, cid)?,
        samples: load_samples(conn, cid)?,
        chat: load_chat(conn, cid)?,
    })
}

/// Whether a composition row exists.
pub fn composition_exists(conn: &Connection, id: CompositionId) -> SqlResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM compositions WHERE id = ?1",
        params![id.get()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
