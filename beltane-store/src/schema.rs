use rusqlite::{Connection, Result as SqlResult};

/// Schema version for the relational format.
pub const SCHEMA_VERSION: i32 = 3;

/// Create all tables for the relational schema.
pub fn create_tables(conn: &Connection) -> SqlResult<()> {
    conn.execute_batch(SCHEMA_SQL)
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

-- ============================================================
-- Compositions
-- ============================================================

CREATE TABLE IF NOT EXISTS compositions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    tempo REAL NOT NULL,
    time_sig_num INTEGER NOT NULL DEFAULT 4,
    time_sig_denom INTEGER NOT NULL DEFAULT 4,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- ============================================================
-- Sequence (tracks, clips, notes, transport)
-- ============================================================

CREATE TABLE IF NOT EXISTS tracks (
    composition_id INTEGER NOT NULL,
    id INTEGER NOT NULL,
    name TEXT NOT NULL,
    position INTEGER NOT NULL,
    muted INTEGER NOT NULL DEFAULT 0,
    soloed INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (composition_id, id)
);

CREATE TABLE IF NOT EXISTS clips (
    composition_id INTEGER NOT NULL,
    id INTEGER NOT NULL,
    track_id INTEGER NOT NULL,
    start_tick INTEGER NOT NULL,
    length_ticks INTEGER NOT NULL,
    PRIMARY KEY (composition_id, id)
);

CREATE TABLE IF NOT EXISTS clip_notes (
    composition_id INTEGER NOT NULL,
    clip_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    tick INTEGER NOT NULL,
    pitch INTEGER NOT NULL,
    velocity INTEGER NOT NULL,
    length_ticks INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS transport_settings (
    composition_id INTEGER PRIMARY KEY,
    loop_enabled INTEGER NOT NULL DEFAULT 0,
    loop_start_tick INTEGER NOT NULL DEFAULT 0,
    loop_end_tick INTEGER NOT NULL DEFAULT 0,
    metronome INTEGER NOT NULL DEFAULT 0,
    swing REAL NOT NULL DEFAULT 0.0
);

-- ============================================================
-- Mixer
-- ============================================================

CREATE TABLE IF NOT EXISTS mixer_channels (
    composition_id INTEGER NOT NULL,
    track_id INTEGER NOT NULL,
    volume REAL NOT NULL,
    pan REAL NOT NULL,
    muted INTEGER NOT NULL,
    soloed INTEGER NOT NULL,
    PRIMARY KEY (composition_id, track_id)
);

CREATE TABLE IF NOT EXISTS mixer_master (
    composition_id INTEGER PRIMARY KEY,
    volume REAL NOT NULL DEFAULT 1.0,
    muted INTEGER NOT NULL DEFAULT 0
);

-- ============================================================
-- Effects
-- ============================================================

CREATE TABLE IF NOT EXISTS effect_units (
    composition_id INTEGER NOT NULL,
    track_id INTEGER NOT NULL,
    id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    kind TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (composition_id, track_id, id)
);

CREATE TABLE IF NOT EXISTS effect_params (
    composition_id INTEGER NOT NULL,
    track_id INTEGER NOT NULL,
    unit_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    value REAL NOT NULL
);

-- ============================================================
-- Samples & Chat
-- ============================================================

CREATE TABLE IF NOT EXISTS sample_assignments (
    composition_id INTEGER NOT NULL,
    track_id INTEGER NOT NULL,
    sample_id TEXT NOT NULL,
    name TEXT NOT NULL,
    gain REAL NOT NULL,
    root_note INTEGER NOT NULL,
    PRIMARY KEY (composition_id, track_id)
);

CREATE TABLE IF NOT EXISTS chat_messages (
    composition_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    author TEXT NOT NULL,
    body TEXT NOT NULL,
    sent_at TEXT NOT NULL
);

-- ============================================================
-- Version history & autosave slot
-- ============================================================

CREATE TABLE IF NOT EXISTS history (
    composition_id INTEGER NOT NULL,
    version INTEGER NOT NULL,
    label TEXT NOT NULL,
    created_at TEXT NOT NULL,
    snapshot BLOB NOT NULL,
    PRIMARY KEY (composition_id, version)
);

CREATE TABLE IF NOT EXISTS autosaves (
    composition_id INTEGER PRIMARY KEY,
    created_at TEXT NOT NULL,
    snapshot BLOB NOT NULL
);
";

/// Record the schema version if the table is empty.
pub fn stamp_version(conn: &Connection) -> SqlResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        [SCHEMA_VERSION],
    )?;
    Ok(())
}
