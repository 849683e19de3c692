//! Composition lifecycle: create, load, delete, list, save.
//!
//! Per-window state machine; nothing here is shared across windows even
//! when they edit the same composition. Save and load run on worker
//! threads against the shared store handle and complete through an mpsc
//! feedback channel, so all in-memory transitions stay on the owner's
//! thread and the only suspension points are the store calls themselves.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use beltane_store::{ProjectStore, SaveOptions, SaveOutcome, StoreError};
use beltane_sync::SyncBus;
use beltane_types::{
    topic, CompositionId, CompositionMeta, CompositionPatch, CompositionSnapshot,
};

use crate::distributor;
use crate::error::CoreError;
use crate::last_session::LastSessionFile;
use crate::partitions::PartitionSet;

/// Where the window is in its composition lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Idle,
    Loading,
    Loaded,
    Saving,
    Error,
}

/// Save bookkeeping for one window.
#[derive(Debug, Default)]
pub struct SaveState {
    pub is_saving: bool,
    /// A save requested while one was in flight; re-run on completion so
    /// intent is never dropped.
    pub pending_save: Option<PendingSave>,
    pub last_save_time: Option<Instant>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct PendingSave {
    pub create_version: bool,
}

/// What kind of save a worker is carrying.
#[derive(Debug, Clone, Copy)]
enum SaveKind {
    Manual { create_version: bool },
    Autosave,
}

/// Completion messages posted by store worker threads.
enum IoFeedback {
    LoadComplete {
        generation: u64,
        id: CompositionId,
        result: Result<CompositionSnapshot, StoreError>,
    },
    SaveComplete {
        generation: u64,
        id: CompositionId,
        kind: SaveKind,
        result: Result<SaveOutcome, StoreError>,
    },
}

/// User-visible outcomes drained from `drain_io`. Autosave completions are
/// deliberately absent: autosave is silent in both directions.
#[derive(Debug, Clone)]
pub enum CoordEvent {
    Loaded(CompositionId),
    LoadFailed { id: CompositionId, error: String },
    Saved { id: CompositionId, history_created: bool },
    SaveFailed { id: CompositionId, error: String },
}

/// Cross-window notice that a composition was saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedNotice {
    pub composition: CompositionId,
}

pub struct Coordinator {
    store: Arc<dyn ProjectStore>,
    io_tx: Sender<IoFeedback>,
    io_rx: Receiver<IoFeedback>,
    compositions: Vec<CompositionMeta>,
    active: Option<CompositionId>,
    phase: LifecyclePhase,
    is_loading: bool,
    save: SaveState,
    /// Raised by the dirty tracker's callback, cleared by successful save
    /// or load (or a sibling's saved notice).
    dirty: Arc<AtomicBool>,
    /// Stale-completion guards: a completion whose generation does not
    /// match the current counter belongs to a superseded attempt.
    load_generation: u64,
    save_generation: u64,
    last_session: LastSessionFile,
}

impl Coordinator {
    pub fn new(store: Arc<dyn ProjectStore>, last_session: LastSessionFile) -> Self {
        let (io_tx, io_rx) = std::sync::mpsc::channel();
        Self {
            store,
            io_tx,
            io_rx,
            compositions: Vec::new(),
            active: None,
            phase: LifecyclePhase::Idle,
            is_loading: false,
            save: SaveState::default(),
            dirty: Arc::new(AtomicBool::new(false)),
            load_generation: 0,
            save_generation: 0,
            last_session,
        }
    }

    pub fn active(&self) -> Option<CompositionId> {
        self.active
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn save_state(&self) -> &SaveState {
        &self.save
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// The flag the dirty tracker's callback raises.
    pub fn dirty_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.dirty)
    }

    pub fn compositions(&self) -> &[CompositionMeta] {
        &self.compositions
    }

    /// The composition recorded by a previous session, for auto-resume.
    pub fn resume_hint(&self) -> Option<CompositionId> {
        self.last_session.load().active_composition
    }

    /// Query the store and repopulate the in-memory list. Never touches
    /// dirty state.
    pub fn refresh_compositions(&mut self) -> Result<&[CompositionMeta], CoreError> {
        self.compositions = self.store.list_compositions()?;
        Ok(&self.compositions)
    }

    /// Create a composition and make it active. The store's fresh (empty)
    /// sequence goes to the sequencer partition; the other partitions
    /// reset to empty defaults so nothing leaks from the previous
    /// composition. On failure nothing changes, including the active id.
    pub fn create_composition(
        &mut self,
        name: &str,
        tempo: f32,
        partitions: &mut PartitionSet,
    ) -> Result<CompositionMeta, CoreError> {
        let meta = self.store.create_composition(name, tempo)?;
        let snapshot = self.store.get_composition(meta.id, false)?;

        partitions.reset_all();
        partitions.sequencer.load(snapshot.sequence);

        self.compositions.push(meta.clone());
        self.activate(meta.id);
        info!("created composition {} '{}'", meta.id, meta.name);
        Ok(meta)
    }

    /// Start loading a composition. Completion arrives through `drain_io`.
    pub fn begin_load(&mut self, id: CompositionId) {
        self.begin_load_with(id, false);
    }

    /// Load the composition's autosave payload instead of its live state:
    /// the crash-recovery path. Shares every invariant with a normal load.
    pub fn begin_load_autosave(&mut self, id: CompositionId) {
        self.begin_load_with(id, true);
    }

    fn begin_load_with(&mut self, id: CompositionId, use_autosave: bool) {
        self.is_loading = true;
        self.phase = LifecyclePhase::Loading;
        self.load_generation += 1;
        // A save completion for the previous composition must not clear
        // the new one's state.
        self.save_generation += 1;

        let generation = self.load_generation;
        let store = Arc::clone(&self.store);
        let io_tx = self.io_tx.clone();
        thread::spawn(move || {
            let result = store.get_composition(id, use_autosave);
            let _ = io_tx.send(IoFeedback::LoadComplete {
                generation,
                id,
                result,
            });
        });
    }

    /// Delete a composition. If it was active, the next available
    /// composition is loaded through the normal load path; with none left
    /// the window returns to idle with empty partitions.
    pub fn delete_composition(
        &mut self,
        id: CompositionId,
        partitions: &mut PartitionSet,
    ) -> Result<(), CoreError> {
        self.store.delete_composition(id)?;
        self.compositions = self.store.list_compositions()?;

        if self.active == Some(id) {
            if let Some(next) = self.compositions.first().map(|m| m.id) {
                self.begin_load(next);
            } else {
                partitions.reset_all();
                self.active = None;
                self.phase = LifecyclePhase::Idle;
                self.dirty.store(false, Ordering::SeqCst);
                self.load_generation += 1;
                self.save_generation += 1;
                self.last_session.record(None);
            }
        }
        Ok(())
    }

    /// Update a composition's metadata through the store and announce the
    /// new metadata to sibling windows. Does not touch the dirty flag:
    /// the change is already durable when this returns.
    pub fn update_composition(
        &mut self,
        id: CompositionId,
        patch: &CompositionPatch,
        bus: &mut SyncBus,
    ) -> Result<CompositionMeta, CoreError> {
        let meta = self.store.update_composition(id, patch)?;
        if let Some(cached) = self.compositions.iter_mut().find(|m| m.id == id) {
            *cached = meta.clone();
        }
        if let Err(e) = bus.publish(topic::COMPOSITION_META, &meta) {
            warn!("failed to publish composition meta: {}", e);
        }
        Ok(meta)
    }

    /// Request a manual save of the active composition.
    ///
    /// Fails fast when nothing is active. While a save is in flight the
    /// request is recorded as a single pending marker and re-run on
    /// completion, preserving at-most-one-in-flight without losing intent.
    pub fn save_composition(&mut self, create_version: bool) -> Result<(), CoreError> {
        let id = self.active.ok_or(CoreError::NoActiveComposition)?;

        if self.save.is_saving {
            let pending = self
                .save
                .pending_save
                .get_or_insert(PendingSave {
                    create_version: false,
                });
            pending.create_version |= create_version;
            debug!("save already in flight; queued pending save");
            return Ok(());
        }

        self.start_save(id, SaveKind::Manual { create_version });
        Ok(())
    }

    /// Autosave attempt from the scheduler. A no-op unless a composition
    /// is active, there are unsaved changes, and no save is in flight.
    /// Returns true if a save was started.
    pub fn request_autosave(&mut self) -> bool {
        let Some(id) = self.active else {
            return false;
        };
        if !self.has_unsaved_changes() || self.save.is_saving || self.is_loading {
            return false;
        }
        self.start_save(id, SaveKind::Autosave);
        true
    }

    fn start_save(&mut self, id: CompositionId, kind: SaveKind) {
        self.save.is_saving = true;
        self.phase = LifecyclePhase::Saving;
        self.save_generation += 1;

        let generation = self.save_generation;
        let opts = SaveOptions {
            create_history: matches!(kind, SaveKind::Manual { create_version: true }),
            is_autosave: matches!(kind, SaveKind::Autosave),
            label: None,
        };
        let store = Arc::clone(&self.store);
        let io_tx = self.io_tx.clone();
        thread::spawn(move || {
            let result = store.save_composition(id, &opts);
            let _ = io_tx.send(IoFeedback::SaveComplete {
                generation,
                id,
                kind,
                result,
            });
        });
    }

    /// Absorb a sibling window's metadata broadcast into the cached list.
    pub fn absorb_meta(&mut self, meta: CompositionMeta) {
        if let Some(cached) = self.compositions.iter_mut().find(|m| m.id == meta.id) {
            *cached = meta;
        } else {
            self.compositions.push(meta);
        }
    }

    /// A sibling window saved this composition: our in-memory state now
    /// matches the store again (last-write-wins), so the dirty flag
    /// clears.
    pub fn note_sibling_saved(&mut self, composition: CompositionId) {
        if self.active == Some(composition) {
            self.dirty.store(false, Ordering::SeqCst);
            debug!("sibling saved {}; clearing dirty flag", composition);
        }
    }

    fn activate(&mut self, id: CompositionId) {
        self.active = Some(id);
        self.phase = LifecyclePhase::Loaded;
        self.is_loading = false;
        self.dirty.store(false, Ordering::SeqCst);
        self.save.last_save_time = Some(Instant::now());
        self.save.last_error = None;
        self.load_generation += 1;
        self.save_generation += 1;
        self.last_session.record(Some(id));
    }

    /// Drain store-call completions and apply their state transitions.
    /// Returns the user-visible outcomes.
    pub fn drain_io(
        &mut self,
        partitions: &mut PartitionSet,
        bus: &mut SyncBus,
    ) -> Vec<CoordEvent> {
        let mut events = Vec::new();

        while let Ok(feedback) = self.io_rx.try_recv() {
            match feedback {
                IoFeedback::LoadComplete {
                    generation,
                    id,
                    result,
                } => {
                    if generation != self.load_generation {
                        debug!("discarding stale load completion for {}", id);
                        continue;
                    }
                    self.is_loading = false;

                    let outcome = match result {
                        Ok(snapshot) => {
                            distributor::distribute(partitions, snapshot).map_err(|e| e.to_string())
                        }
                        Err(e) => Err(e.to_string()),
                    };

                    match outcome {
                        Ok(()) => {
                            self.active = Some(id);
                            self.phase = LifecyclePhase::Loaded;
                            self.dirty.store(false, Ordering::SeqCst);
                            self.save.last_save_time = Some(Instant::now());
                            self.save.last_error = None;
                            self.last_session.record(Some(id));
                            info!("loaded composition {}", id);
                            events.push(CoordEvent::Loaded(id));
                        }
                        Err(error) => {
                            // Revert the active id and persist the
                            // reversion; partitions were left untouched by
                            // the all-or-nothing distributor.
                            self.active = None;
                            self.phase = LifecyclePhase::Error;
                            self.save.last_error = Some(error.clone());
                            self.last_session.record(None);
                            warn!("load of {} failed: {}", id, error);
                            events.push(CoordEvent::LoadFailed { id, error });
                        }
                    }
                }
                IoFeedback::SaveComplete {
                    generation,
                    id,
                    kind,
                    result,
                } => {
                    // Only one save is ever outstanding, so the flag
                    // clears even for a stale completion; the state
                    // effects below are what a stale completion must not
                    // apply.
                    self.save.is_saving = false;
                    if self.phase == LifecyclePhase::Saving {
                        self.phase = if self.active.is_some() {
                            LifecyclePhase::Loaded
                        } else {
                            LifecyclePhase::Idle
                        };
                    }

                    if generation == self.save_generation {
                        match result {
                            Ok(outcome) => {
                                self.dirty.store(false, Ordering::SeqCst);
                                self.save.last_save_time = Some(Instant::now());
                                self.save.last_error = None;
                                if let Err(e) =
                                    bus.publish(topic::COMPOSITION_SAVED, &SavedNotice {
                                        composition: id,
                                    })
                                {
                                    warn!("failed to publish saved notice: {}", e);
                                }
                                match kind {
                                    SaveKind::Manual { .. } => {
                                        info!("saved composition {}", id);
                                        events.push(CoordEvent::Saved {
                                            id,
                                            history_created: outcome.history_created,
                                        });
                                    }
                                    SaveKind::Autosave => {
                                        debug!("autosave of {} complete", id);
                                    }
                                }
                            }
                            Err(e) => match kind {
                                SaveKind::Manual { .. } => {
                                    let error = e.to_string();
                                    self.save.last_error = Some(error.clone());
                                    events.push(CoordEvent::SaveFailed { id, error });
                                }
                                // Autosave failures stay out of the user's
                                // face; the dirty flag is still set, so
                                // the next tick retries.
                                SaveKind::Autosave => {
                                    warn!("autosave of {} failed: {}", id, e);
                                }
                            },
                        }
                    } else {
                        debug!("discarding stale save completion for {}", id);
                    }

                    // Run the queued save now that the slot is free.
                    if let Some(pending) = self.save.pending_save.take() {
                        if let Some(active) = self.active {
                            self.start_save(
                                active,
                                SaveKind::Manual {
                                    create_version: pending.create_version,
                                },
                            );
                        }
                    }
                }
            }
        }

        events
    }
}
