//! One editor window's wiring: store, bus, partitions, coordinator,
//! autosave, leader election, history.
//!
//! `pump(now)` runs one cooperative turn of the window's event loop:
//! drain the bus and route broadcasts, drain store-call completions, tick
//! the elector and the autosave scheduler. Everything in between is
//! synchronous on the caller's thread.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};

use beltane_store::ProjectStore;
use beltane_sync::{Subscription, SyncBus, WindowId};
use beltane_types::{topic, CompositionId, CompositionMeta, CompositionPatch, VersionEntry};

use crate::autosave::AutosaveScheduler;
use crate::config::Config;
use crate::coordinator::{CoordEvent, Coordinator, LifecyclePhase, SaveState, SavedNotice};
use crate::dirty::DirtyTracker;
use crate::error::CoreError;
use crate::history::VersionHistory;
use crate::last_session::LastSessionFile;
use crate::leader::{LeaderClaim, LeaderElector};
use crate::partitions::{EditContext, PartitionSet};

/// Construction options for one window.
pub struct SessionOptions {
    pub window_name: String,
    /// Auto-resume the last-open composition recorded by a previous
    /// session.
    pub resume: bool,
    /// Override for the last-session file location (tests).
    pub last_session_path: Option<PathBuf>,
    pub autosave_enabled: bool,
    pub autosave_interval: Duration,
    pub autosave_initial_delay: Duration,
}

impl SessionOptions {
    pub fn new(window_name: impl Into<String>) -> Self {
        Self {
            window_name: window_name.into(),
            resume: false,
            last_session_path: None,
            autosave_enabled: true,
            autosave_interval: Duration::from_secs(60),
            autosave_initial_delay: Duration::from_secs(10),
        }
    }

    pub fn from_config(window_name: impl Into<String>, config: &Config) -> Self {
        Self {
            window_name: window_name.into(),
            resume: true,
            last_session_path: None,
            autosave_enabled: config.autosave_enabled(),
            autosave_interval: config.autosave_interval(),
            autosave_initial_delay: config.autosave_initial_delay(),
        }
    }
}

/// Per-topic bus subscriptions held for the session's lifetime.
struct TopicSubscriptions {
    domain: Vec<(&'static str, Subscription)>,
    meta: Subscription,
    saved: Subscription,
    leader: Subscription,
}

impl TopicSubscriptions {
    fn attach(bus: &mut SyncBus) -> Self {
        let domain = topic::DOMAIN_TOPICS
            .iter()
            .map(|&t| (t, bus.subscribe(t)))
            .collect();
        Self {
            domain,
            meta: bus.subscribe(topic::COMPOSITION_META),
            saved: bus.subscribe(topic::COMPOSITION_SAVED),
            leader: bus.subscribe(topic::AUTOSAVE_LEADER),
        }
    }
}

/// Partition access for mutators, handed out only while a composition is
/// active.
pub struct Edit<'a> {
    pub parts: &'a mut PartitionSet,
    pub ctx: EditContext<'a>,
}

pub struct EditorSession {
    store: Arc<dyn ProjectStore>,
    bus: SyncBus,
    subs: TopicSubscriptions,
    parts: PartitionSet,
    dirty: DirtyTracker,
    coordinator: Coordinator,
    autosave: AutosaveScheduler,
    elector: LeaderElector,
    history: VersionHistory,
    /// The composition the autosave/elector pair is currently armed for.
    armed_for: Option<CompositionId>,
}

impl EditorSession {
    /// Attach to the hub and wire the window together. Lists the store's
    /// compositions and, when asked, begins resuming the last-open one.
    pub fn connect(
        store: Arc<dyn ProjectStore>,
        hub_addr: &str,
        options: SessionOptions,
    ) -> Result<Self, CoreError> {
        let mut bus = SyncBus::connect(hub_addr, &options.window_name)?;
        let subs = TopicSubscriptions::attach(&mut bus);

        let last_session = LastSessionFile::new(
            options
                .last_session_path
                .unwrap_or_else(LastSessionFile::default_path),
        );

        let mut dirty = DirtyTracker::new();
        let coordinator = Coordinator::new(Arc::clone(&store), last_session);
        let flag = coordinator.dirty_flag();
        dirty.register(move || flag.store(true, Ordering::SeqCst));

        let elector = LeaderElector::new(bus.window_id());
        let autosave = AutosaveScheduler::with_timing(
            options.autosave_enabled,
            options.autosave_interval,
            options.autosave_initial_delay,
        );
        let history = VersionHistory::new(Arc::clone(&store));

        let mut session = Self {
            store,
            bus,
            subs,
            parts: PartitionSet::new(),
            dirty,
            coordinator,
            autosave,
            elector,
            history,
            armed_for: None,
        };

        if let Err(e) = session.coordinator.refresh_compositions() {
            warn!("could not list compositions at startup: {}", e);
        }

        if options.resume {
            if let Some(id) = session.coordinator.resume_hint() {
                if session.coordinator.compositions().iter().any(|m| m.id == id) {
                    info!("auto-resuming composition {}", id);
                    session.coordinator.begin_load(id);
                }
            }
        }

        Ok(session)
    }

    pub fn window_id(&self) -> WindowId {
        self.bus.window_id()
    }

    /// One cooperative turn of the window's event loop.
    pub fn pump(&mut self, now: Instant) -> Vec<CoordEvent> {
        self.bus.pump();
        self.route_broadcasts(now);

        let events = self.coordinator.drain_io(&mut self.parts, &mut self.bus);

        self.sync_activation(now);
        self.elector.tick(now, &mut self.bus);
        self.autosave
            .tick(now, self.elector.is_leader(now), &mut self.coordinator);

        events
    }

    fn route_broadcasts(&mut self, now: Instant) {
        // Domain topics: each value is an authoritative replacement, so
        // only the latest matters. Absorbing one means this window's
        // in-memory state no longer matches what it last saved.
        let mut absorbed = false;
        for (topic_name, sub) in &self.subs.domain {
            if let Some(value) = sub.latest() {
                match self.parts.apply_broadcast(topic_name, value) {
                    Ok(true) => absorbed = true,
                    Ok(false) => {}
                    Err(e) => warn!("ignoring bad broadcast on {}: {}", topic_name, e),
                }
            }
        }
        if absorbed {
            self.dirty.notify_changed();
        }

        for value in self.subs.meta.drain() {
            match serde_json::from_value::<CompositionMeta>(value) {
                Ok(meta) => self.coordinator.absorb_meta(meta),
                Err(e) => warn!("ignoring bad composition meta broadcast: {}", e),
            }
        }

        for value in self.subs.leader.drain() {
            match serde_json::from_value::<LeaderClaim>(value) {
                Ok(claim) => self.elector.apply_claim(claim, now),
                Err(e) => warn!("ignoring bad leadership claim: {}", e),
            }
        }

        // Saved notices last: a sibling's save follows its mutations, so
        // mutations delivered in the same turn are covered by it.
        for value in self.subs.saved.drain() {
            match serde_json::from_value::<SavedNotice>(value) {
                Ok(notice) => self.coordinator.note_sibling_saved(notice.composition),
                Err(e) => warn!("ignoring bad saved notice: {}", e),
            }
        }
    }

    /// Keep the elector and autosave timers in step with the active
    /// composition: activating arms both from scratch, deactivating
    /// cancels them.
    fn sync_activation(&mut self, now: Instant) {
        let active = self.coordinator.active();
        if self.armed_for != active {
            self.elector.set_active(active);
            match active {
                Some(_) => self.autosave.arm(now),
                None => self.autosave.disarm(),
            }
            self.armed_for = active;
        }
    }

    // ── Coordinator operations ──────────────────────────────────────

    pub fn create_composition(
        &mut self,
        name: &str,
        tempo: f32,
    ) -> Result<CompositionMeta, CoreError> {
        let meta = self
            .coordinator
            .create_composition(name, tempo, &mut self.parts)?;
        self.sync_activation(Instant::now());
        Ok(meta)
    }

    /// Begin loading a composition; the outcome arrives as a
    /// [`CoordEvent`] from a later `pump`.
    pub fn load_composition(&mut self, id: CompositionId) {
        self.coordinator.begin_load(id);
    }

    pub fn delete_composition(&mut self, id: CompositionId) -> Result<(), CoreError> {
        self.coordinator.delete_composition(id, &mut self.parts)?;
        self.sync_activation(Instant::now());
        Ok(())
    }

    pub fn update_composition(
        &mut self,
        id: CompositionId,
        patch: &CompositionPatch,
    ) -> Result<CompositionMeta, CoreError> {
        self.coordinator.update_composition(id, patch, &mut self.bus)
    }

    pub fn save_composition(&mut self, create_version: bool) -> Result<(), CoreError> {
        self.coordinator.save_composition(create_version)
    }

    pub fn refresh_compositions(&mut self) -> Result<&[CompositionMeta], CoreError> {
        self.coordinator.refresh_compositions()
    }

    pub fn compositions(&self) -> &[CompositionMeta] {
        self.coordinator.compositions()
    }

    pub fn active_composition(&self) -> Option<CompositionId> {
        self.coordinator.active()
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.coordinator.phase()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.coordinator.has_unsaved_changes()
    }

    pub fn save_state(&self) -> &SaveState {
        self.coordinator.save_state()
    }

    // ── Version history ─────────────────────────────────────────────

    pub fn list_history(&self, id: CompositionId) -> Result<Vec<VersionEntry>, CoreError> {
        self.history.list(id)
    }

    pub fn restore_version(
        &mut self,
        id: CompositionId,
        version: i64,
    ) -> Result<(), CoreError> {
        self.history
            .restore_version(&mut self.coordinator, id, version)
    }

    pub fn recover_from_autosave(&mut self, id: CompositionId) -> Result<(), CoreError> {
        self.history
            .recover_from_autosave(&mut self.coordinator, id)
    }

    // ── Partitions ──────────────────────────────────────────────────

    /// Read access to the four partitions.
    pub fn partitions(&self) -> &PartitionSet {
        &self.parts
    }

    /// Mutation access: partitions plus the context their mutators need.
    /// Fails fast when no composition is active.
    pub fn edit(&mut self) -> Result<Edit<'_>, CoreError> {
        let composition = self
            .coordinator
            .active()
            .ok_or(CoreError::NoActiveComposition)?;
        Ok(Edit {
            parts: &mut self.parts,
            ctx: EditContext {
                store: self.store.as_ref(),
                bus: &mut self.bus,
                dirty: &self.dirty,
                composition,
            },
        })
    }

    // ── Autosave & leadership ───────────────────────────────────────

    pub fn set_autosave_enabled(&mut self, enabled: bool) {
        self.autosave.set_enabled(enabled);
        if enabled && self.coordinator.active().is_some() {
            self.autosave.arm(Instant::now());
        }
    }

    pub fn autosave_enabled(&self) -> bool {
        self.autosave.is_enabled()
    }

    pub fn is_autosave_leader(&self, now: Instant) -> bool {
        self.elector.is_leader(now)
    }
}
