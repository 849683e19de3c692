//! Version history rows and the per-composition autosave slot.
//!
//! Each history row carries a complete MessagePack snapshot; versions
//! increment per composition and are never reused. The autosave slot is a
//! single row that each autosave replaces.

use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};

use beltane_types::{CompositionId, CompositionSnapshot, VersionEntry};

use crate::blob;
use crate::load;
use crate::save;
use crate::StoreError;

/// Append a history row for the composition's current live state.
/// Returns the new version number.
pub fn create_version(
    conn: &Connection,
    id: CompositionId,
    label: &str,
) -> Result<i64, StoreError> {
    let snapshot = load::load_snapshot(conn, id)?;
    let bytes = blob::serialize_snapshot(&snapshot)
        .map_err(|e| StoreError::Corrupt(format!("failed to encode snapshot: {}", e)))?;

    let next_version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) + 1 FROM history WHERE composition_id = ?1",
        [id.get()],
        |row| row.get(0),
    )?;

    conn.execute(
        "INSERT INTO history (composition_id, version, label, created_at, snapshot)
         VALUES (?1, ?2, ?3, datetime('now'), ?4)",
        params![id.get(), next_version, label, bytes],
    )?;

    Ok(next_version)
}

/// All history entries for a composition, newest first.
pub fn list_versions(conn: &Connection, id: CompositionId) -> SqlResult<Vec<VersionEntry>> {
    let mut stmt = conn.prepare(
        "SELECT version, created_at, label FROM history
         WHERE composition_id = ?1 ORDER BY version DESC",
    )?;
    let rows = stmt.query_map([id.get()], |row| {
        Ok(VersionEntry {
            version: row.get(0)?,
            created_at: row.get(1)?,
            label: row.get(2)?,
        })
    })?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

/// Replace the composition's live rows from a stored version and return the
/// restored snapshot.
pub fn restore_version(
    conn: &Connection,
    id: CompositionId,
    version: i64,
) -> Result<CompositionSnapshot, StoreError> {
    let bytes: Option<Vec<u8>> = conn
        .query_row(
            "SELECT snapshot FROM history WHERE composition_id = ?1 AND version = ?2",
            params![id.get(), version],
            |row| row.get(0),
        )
        .optional()?;
    let bytes = bytes.ok_or(StoreError::NoSuchVersion(id, version))?;

    let snapshot = blob::deserialize_snapshot(&bytes)
        .map_err(|e| StoreError::Corrupt(format!("failed to decode version {}: {}", version, e)))?;

    save::replace_all(conn, id, &snapshot)?;

    Ok(snapshot)
}

/// Replace the composition's autosave slot with its current live state.
pub fn write_autosave(conn: &Connection, id: CompositionId) -> Result<(), StoreError> {
    let snapshot = load::load_snapshot(conn, id)?;
    let bytes = blob::serialize_snapshot(&snapshot)
        .map_err(|e| StoreError::Corrupt(format!("failed to encode autosave: {}", e)))?;

    conn.execute(
        "INSERT OR REPLACE INTO autosaves (composition_id, created_at, snapshot)
         VALUES (?1, datetime('now'), ?2)",
        params![id.get(), bytes],
    )?;

    Ok(())
}

/// Read the autosave slot's snapshot.
pub fn read_autosave(
    conn: &Connection,
    id: CompositionId,
) -> Result<CompositionSnapshot, StoreError> {
    let bytes: Option<Vec<u8>> = conn
        .query_row(
            "SELECT snapshot FROM autosaves WHERE composition_id = ?1",
            [id.get()],
            |row| row.get(0),
        )
        .optional()?;
    let bytes = bytes.ok_or(StoreError::NoAutosave(id))?;

    blob::deserialize_snapshot(&bytes)
        .map_err(|e| StoreError::Corrupt(format!("failed to decode autosave: {}", e)))
}

/// Drop the autosave slot. Explicit saves supersede crash snapshots.
pub fn clear_autosave(conn: &Connection, id: CompositionId) -> SqlResult<()> {
    conn.execute("DELETE FROM autosaves WHERE composition_id = ?1", [id.get()])?;
    Ok(())
}
