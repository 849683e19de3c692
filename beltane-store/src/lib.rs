//! # beltane-store
//!
//! The persistence service for Beltane compositions: a request/response
//! store behind the [`ProjectStore`] trait, with [`SqliteStore`] as the
//! SQLite-backed implementation.
//!
//! Live state is relational (one set of tables per slice, replaced
//! wholesale by the partition-local writes). Version history and the
//! autosave slot carry complete MessagePack snapshot blobs, in the spirit
//! of checkpointing: restoring a version replaces the live rows from its
//! blob so a subsequent load observes the restored state.

mod blob;
mod history;
mod load;
mod save;
pub mod schema;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::info;
use rusqlite::Connection;

use beltane_types::{
    CompositionId, CompositionMeta, CompositionPatch, CompositionSnapshot, EffectChain,
    MixerState, SampleAssignment, SequenceDoc, TrackId, VersionEntry,
};

/// Errors surfaced by the persistence service.
#[derive(Debug)]
pub enum StoreError {
    /// The composition does not exist.
    NotFound(CompositionId),
    /// No autosave slot exists for the composition.
    NoAutosave(CompositionId),
    /// The requested history version does not exist.
    NoSuchVersion(CompositionId, i64),
    /// A stored blob could not be decoded.
    Corrupt(String),
    /// Backend failure (SQL, I/O, or a mock's injected fault).
    Backend(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "composition {} not found", id),
            StoreError::NoAutosave(id) => write!(f, "no autosave for composition {}", id),
            StoreError::NoSuchVersion(id, v) => {
                write!(f, "composition {} has no version {}", id, v)
            }
            StoreError::Corrupt(msg) => write!(f, "corrupt stored data: {}", msg),
            StoreError::Backend(msg) => write!(f, "store backend error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Options for a whole-composition save.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Append a version history entry for the saved state.
    pub create_history: bool,
    /// This save is an autosave: write the autosave slot instead of
    /// superseding it.
    pub is_autosave: bool,
    /// Label for the history entry, when one is created.
    pub label: Option<String>,
}

/// Result of a whole-composition save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    pub history_created: bool,
}

/// Request/response contract between the coordinator and the store.
///
/// Implementations must be usable from a worker thread behind an `Arc`;
/// `SqliteStore` achieves this by opening a short-lived connection per call.
pub trait ProjectStore: Send + Sync {
    fn create_composition(&self, name: &str, tempo: f32) -> Result<CompositionMeta, StoreError>;
    fn list_compositions(&self) -> Result<Vec<CompositionMeta>, StoreError>;
    fn get_composition(
        &self,
        id: CompositionId,
        use_autosave: bool,
    ) -> Result<CompositionSnapshot, StoreError>;
    fn update_composition(
        &self,
        id: CompositionId,
        patch: &CompositionPatch,
    ) -> Result<CompositionMeta, StoreError>;
    fn save_composition(
        &self,
        id: CompositionId,
        opts: &SaveOptions,
    ) -> Result<SaveOutcome, StoreError>;
    fn delete_composition(&self, id: CompositionId) -> Result<(), StoreError>;
    fn list_history(&self, id: CompositionId) -> Result<Vec<VersionEntry>, StoreError>;
    fn restore_version(
        &self,
        id: CompositionId,
        version: i64,
    ) -> Result<CompositionSnapshot, StoreError>;
    fn recover_autosave(&self, id: CompositionId) -> Result<CompositionSnapshot, StoreError>;

    // Partition-local writes: each replaces one slice of the live rows.
    fn save_sequence(&self, id: CompositionId, doc: &SequenceDoc) -> Result<(), StoreError>;
    fn save_mixer(&self, id: CompositionId, mixer: &MixerState) -> Result<(), StoreError>;
    fn save_effects(
        &self,
        id: CompositionId,
        effects: &HashMap<TrackId, EffectChain>,
    ) -> Result<(), StoreError>;
    fn save_samples(
        &self,
        id: CompositionId,
        samples: &HashMap<TrackId, SampleAssignment>,
    ) -> Result<(), StoreError>;
}

/// SQLite-backed persistence service.
///
/// Holds only the database path; every call opens its own connection with
/// WAL journaling so the handle is freely shareable across threads.
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Open (or create) the store at `path` and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        schema::create_tables(&conn)?;
        schema::stamp_version(&conn)?;
        info!("store opened at {}", path.display());
        Ok(Self { path })
    }

    fn conn(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(conn)
    }

    fn require(&self, conn: &Connection, id: CompositionId) -> Result<(), StoreError> {
        if load::composition_exists(conn, id)? {
            Ok(())
        } else {
            Err(StoreError::NotFound(id))
        }
    }

    fn touch(&self, conn: &Connection, id: CompositionId) -> Result<(), StoreError> {
        conn.execute(
            "UPDATE compositions SET updated_at = datetime('now') WHERE id = ?1",
            [id.get()],
        )?;
        Ok(())
    }
}

impl ProjectStore for SqliteStore {
    fn create_composition(&self, name: &str, tempo: f32) -> Result<CompositionMeta, StoreError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO compositions (name, tempo, created_at, updated_at)
             VALUES (?1, ?2, datetime('now'), datetime('now'))",
            rusqlite::params![name, tempo],
        )?;
        let id = CompositionId::new(tx.last_insert_rowid());

        // A new composition starts with an empty sequence, default transport
        // and a default master strip.
        save::replace_sequence(&tx, id, &SequenceDoc::new())?;
        save::replace_mixer(&tx, id, &MixerState::new())?;
        tx.commit()?;

        load::read_meta(&conn, id)?.ok_or(StoreError::NotFound(id))
    }

    fn list_compositions(&self) -> Result<Vec<CompositionMeta>, StoreError> {
        let conn = self.conn()?;
        Ok(load::list_metas(&conn)?)
    }

    fn get_composition(
        &self,
        id: CompositionId,
        use_autosave: bool,
    ) -> Result<CompositionSnapshot, StoreError> {
        let conn = self.conn()?;
        self.require(&conn, id)?;
        if use_autosave {
            history::read_autosave(&conn, id)
        } else {
            Ok(load::load_snapshot(&conn, id)?)
        }
    }

    fn update_composition(
        &self,
        id: CompositionId,
        patch: &CompositionPatch,
    ) -> Result<CompositionMeta, StoreError> {
        let conn = self.conn()?;
        self.require(&conn, id)?;

        if let Some(name) = &patch.name {
            conn.execute(
                "UPDATE compositions SET name = ?1 WHERE id = ?2",
                rusqlite::params![name, id.get()],
            )?;
        }
        if let Some(tempo) = patch.tempo {
            conn.execute(
                "UPDATE compositions SET tempo = ?1 WHERE id = ?2",
                rusqlite::params![tempo, id.get()],
            )?;
        }
        if let Some((num, denom)) = patch.time_signature {
            conn.execute(
                "UPDATE compositions SET time_sig_num = ?1, time_sig_denom = ?2 WHERE id = ?3",
                rusqlite::params![num, denom, id.get()],
            )?;
        }
        self.touch(&conn, id)?;

        load::read_meta(&conn, id)?.ok_or(StoreError::NotFound(id))
    }

    fn save_composition(
        &self,
        id: CompositionId,
        opts: &SaveOptions,
    ) -> Result<SaveOutcome, StoreError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        self.require(&tx, id)?;

        let mut history_created = false;
        if opts.is_autosave {
            history::write_autosave(&tx, id)?;
        } else {
            if opts.create_history {
                let label = opts.label.as_deref().unwrap_or("Manual save");
                let version = history::create_version(&tx, id, label)?;
                info!("composition {} saved as version {}", id, version);
                history_created = true;
            }
            // An explicit save supersedes any crash snapshot.
            history::clear_autosave(&tx, id)?;
        }
        self.touch(&tx, id)?;
        tx.commit()?;

        Ok(SaveOutcome { history_created })
    }

    fn delete_composition(&self, id: CompositionId) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        self.require(&tx, id)?;
        save::delete_all(&tx, id)?;
        tx.commit()?;
        info!("composition {} deleted", id);
        Ok(())
    }

    fn list_history(&self, id: CompositionId) -> Result<Vec<VersionEntry>, StoreError> {
        let conn = self.conn()?;
        self.require(&conn, id)?;
        Ok(history::list_versions(&conn, id)?)
    }

    fn restore_version(
        &self,
        id: CompositionId,
        version: i64,
    ) -> Result<CompositionSnapshot, StoreError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        self.require(&tx, id)?;
        let snapshot = history::restore_version(&tx, id, version)?;
        self.touch(&tx, id)?;
        tx.commit()?;
        Ok(snapshot)
    }

    fn recover_autosave(&self, id: CompositionId) -> Result<CompositionSnapshot, StoreError> {
        let conn = self.conn()?;
        self.require(&conn, id)?;
        history::read_autosave(&conn, id)
    }

    fn save_sequence(&self, id: CompositionId, doc: &SequenceDoc) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        self.require(&tx, id)?;
        save::replace_sequence(&tx, id, doc)?;
        tx.commit()?;
        Ok(())
    }

    fn save_mixer(&self, id: CompositionId, mixer: &MixerState) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        self.require(&tx, id)?;
        save::replace_mixer(&tx, id, mixer)?;
        tx.commit()?;
        Ok(())
    }

    fn save_effects(
        &self,
        id: CompositionId,
        effects: &HashMap<TrackId, EffectChain>,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        self.require(&tx, id)?;
        save::replace_effects(&tx, id, effects)?;
        tx.commit()?;
        Ok(())
    }

    fn save_samples(
        &self,
        id: CompositionId,
        samples: &HashMap<TrackId, SampleAssignment>,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        self.require(&tx, id)?;
        save::replace_samples(&tx, id, samples)?;
        tx.commit()?;
        Ok(())
    }
}
