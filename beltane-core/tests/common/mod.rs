#![allow(dead_code)]
//! Test harness for beltane-core integration tests: an in-memory store
//! with fault injection and concurrency instrumentation, plus a hub
//! driven from a background thread.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use beltane_core::{CoordEvent, EditorSession, SessionOptions};
use beltane_store::{ProjectStore, SaveOptions, SaveOutcome, StoreError};
use beltane_sync::SyncHub;
use beltane_types::{
    CompositionId, CompositionMeta, CompositionPatch, CompositionSnapshot, EffectChain,
    MixerState, SampleAssignment, SequenceDoc, TrackId, VersionEntry,
};

// ── Hub ─────────────────────────────────────────────────────────────

pub struct HubHandle {
    pub addr: String,
    shutdown: Arc<AtomicBool>,
}

impl Drop for HubHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

pub fn spawn_hub() -> HubHandle {
    let mut hub = SyncHub::bind("127.0.0.1:0").unwrap();
    let addr = hub.local_addr().unwrap().to_string();
    let shutdown = Arc::new(AtomicBool::new(false));

    let shutdown_in = Arc::clone(&shutdown);
    thread::spawn(move || loop {
        hub.accept_connections();
        hub.pump();
        if shutdown_in.load(Ordering::SeqCst) {
            break;
        }
        thread::sleep(Duration::from_millis(2));
    });

    HubHandle { addr, shutdown }
}

// ── Mock store ──────────────────────────────────────────────────────

struct StoredComposition {
    meta: CompositionMeta,
    snapshot: CompositionSnapshot,
    autosave: Option<CompositionSnapshot>,
    history: Vec<(VersionEntry, CompositionSnapshot)>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    compositions: BTreeMap<i64, StoredComposition>,
}

/// One recorded whole-composition save.
#[derive(Debug, Clone, Copy)]
pub struct RecordedSave {
    pub create_history: bool,
    pub is_autosave: bool,
}

/// In-memory `ProjectStore` with fault injection. Whole-composition saves
/// optionally sleep so tests can observe overlap; the concurrency high
/// water mark is tracked without holding the state lock during the sleep.
pub struct MockStore {
    inner: Mutex<Inner>,
    pub get_calls: AtomicUsize,
    pub save_calls: AtomicUsize,
    pub slice_calls: AtomicUsize,
    concurrent_saves: AtomicUsize,
    pub max_concurrent_saves: AtomicUsize,
    pub save_delay: Mutex<Duration>,
    pub fail_next_saves: AtomicUsize,
    pub fail_next_loads: AtomicUsize,
    /// Serve the next snapshot with a mixer row keyed by a track the
    /// sequence never minted.
    pub corrupt_next_load: AtomicBool,
    pub save_log: Mutex<Vec<RecordedSave>>,
}

impl MockStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner::default()),
            get_calls: AtomicUsize::new(0),
            save_calls: AtomicUsize::new(0),
            slice_calls: AtomicUsize::new(0),
            concurrent_saves: AtomicUsize::new(0),
            max_concurrent_saves: AtomicUsize::new(0),
            save_delay: Mutex::new(Duration::ZERO),
            fail_next_saves: AtomicUsize::new(0),
            fail_next_loads: AtomicUsize::new(0),
            corrupt_next_load: AtomicBool::new(false),
            save_log: Mutex::new(Vec::new()),
        })
    }

    pub fn set_save_delay(&self, delay: Duration) {
        *self.save_delay.lock().unwrap() = delay;
    }

    pub fn history_len(&self, id: CompositionId) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .compositions
            .get(&id.get())
            .map(|c| c.history.len())
            .unwrap_or(0)
    }

    pub fn saves_recorded(&self) -> Vec<RecordedSave> {
        self.save_log.lock().unwrap().clone()
    }

    fn with_composition<T>(
        &self,
        id: CompositionId,
        f: impl FnOnce(&mut StoredComposition) -> T,
    ) -> Result<T, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let stored = inner
            .compositions
            .get_mut(&id.get())
            .ok_or(StoreError::NotFound(id))?;
        Ok(f(stored))
    }

    fn meta_with_counts(stored: &StoredComposition) -> CompositionMeta {
        let mut meta = stored.meta.clone();
        meta.track_count = stored.snapshot.sequence.tracks.len() as u32;
        meta.clip_count = stored.snapshot.sequence.clip_count() as u32;
        meta
    }
}

impl ProjectStore for MockStore {
    fn create_composition(&self, name: &str, tempo: f32) -> Result<CompositionMeta, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = CompositionId::new(inner.next_id);
        let meta = CompositionMeta {
            id,
            name: name.to_string(),
            tempo,
            time_signature: (4, 4),
            created_at: "2024-03-11 10:00:00".into(),
            updated_at: "2024-03-11 10:00:00".into(),
            track_count: 0,
            clip_count: 0,
        };
        inner.compositions.insert(
            id.get(),
            StoredComposition {
                meta: meta.clone(),
                snapshot: CompositionSnapshot::default(),
                autosave: None,
                history: Vec::new(),
            },
        );
        Ok(meta)
    }

    fn list_compositions(&self) -> Result<Vec<CompositionMeta>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .compositions
            .values()
            .map(Self::meta_with_counts)
            .collect())
    }

    fn get_composition(
        &self,
        id: CompositionId,
        use_autosave: bool,
    ) -> Result<CompositionSnapshot, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);

        if self
            .fail_next_loads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Backend("injected load failure".into()));
        }

        if self.corrupt_next_load.swap(false, Ordering::SeqCst) {
            let mut snapshot = self.with_composition(id, |c| c.snapshot.clone())?;
            snapshot.mixer.channel_mut(TrackId::new(9_999));
            return Ok(snapshot);
        }

        self.with_composition(id, |c| {
            if use_autosave {
                c.autosave.clone().ok_or(StoreError::NoAutosave(id))
            } else {
                Ok(c.snapshot.clone())
            }
        })?
    }

    fn update_composition(
        &self,
        id: CompositionId,
        patch: &CompositionPatch,
    ) -> Result<CompositionMeta, StoreError> {
        self.with_composition(id, |c| {
            if let Some(name) = &patch.name {
                c.meta.name = name.clone();
            }
            if let Some(tempo) = patch.tempo {
                c.meta.tempo = tempo;
            }
            if let Some(ts) = patch.time_signature {
                c.meta.time_signature = ts;
            }
            Self::meta_with_counts(c)
        })
    }

    fn save_composition(
        &self,
        id: CompositionId,
        opts: &SaveOptions,
    ) -> Result<SaveOutcome, StoreError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.save_log.lock().unwrap().push(RecordedSave {
            create_history: opts.create_history,
            is_autosave: opts.is_autosave,
        });

        // Track overlap without holding the state lock while sleeping.
        let current = self.concurrent_saves.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_saves
            .fetch_max(current, Ordering::SeqCst);
        let delay = *self.save_delay.lock().unwrap();
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let result = if self
            .fail_next_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            Err(StoreError::Backend("injected save failure".into()))
        } else {
            self.with_composition(id, |c| {
                let mut history_created = false;
                if opts.is_autosave {
                    c.autosave = Some(c.snapshot.clone());
                } else {
                    if opts.create_history {
                        let version = c.history.len() as i64 + 1;
                        c.history.insert(
                            0,
                            (
                                VersionEntry {
                                    version,
                                    created_at: "2024-03-11 11:00:00".into(),
                                    label: opts
                                        .label
                                        .clone()
                                        .unwrap_or_else(|| "Manual save".into()),
                                },
                                c.snapshot.clone(),
                            ),
                        );
                        history_created = true;
                    }
                    c.autosave = None;
                }
                SaveOutcome { history_created }
            })
        };

        self.concurrent_saves.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn delete_composition(&self, id: CompositionId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .compositions
            .remove(&id.get())
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    fn list_history(&self, id: CompositionId) -> Result<Vec<VersionEntry>, StoreError> {
        self.with_composition(id, |c| c.history.iter().map(|(e, _)| e.clone()).collect())
    }

    fn restore_version(
        &self,
        id: CompositionId,
        version: i64,
    ) -> Result<CompositionSnapshot, StoreError> {
        self.with_composition(id, |c| {
            let snapshot = c
                .history
                .iter()
                .find(|(e, _)| e.version == version)
                .map(|(_, s)| s.clone())
                .ok_or(StoreError::NoSuchVersion(id, version))?;
            c.snapshot = snapshot.clone();
            Ok(snapshot)
        })?
    }

    fn recover_autosave(&self, id: CompositionId) -> Result<CompositionSnapshot, StoreError> {
        self.with_composition(id, |c| c.autosave.clone().ok_or(StoreError::NoAutosave(id)))?
    }

    fn save_sequence(&self, id: CompositionId, doc: &SequenceDoc) -> Result<(), StoreError> {
        self.slice_calls.fetch_add(1, Ordering::SeqCst);
        self.with_composition(id, |c| c.snapshot.sequence = doc.clone())
    }

    fn save_mixer(&self, id: CompositionId, mixer: &MixerState) -> Result<(), StoreError> {
        self.slice_calls.fetch_add(1, Ordering::SeqCst);
        self.with_composition(id, |c| c.snapshot.mixer = mixer.clone())
    }

    fn save_effects(
        &self,
        id: CompositionId,
        effects: &HashMap<TrackId, EffectChain>,
    ) -> Result<(), StoreError> {
        self.slice_calls.fetch_add(1, Ordering::SeqCst);
        self.with_composition(id, |c| c.snapshot.effects = effects.clone())
    }

    fn save_samples(
        &self,
        id: CompositionId,
        samples: &HashMap<TrackId, SampleAssignment>,
    ) -> Result<(), StoreError> {
        self.slice_calls.fetch_add(1, Ordering::SeqCst);
        self.with_composition(id, |c| c.snapshot.samples = samples.clone())
    }
}

// ── Session helpers ─────────────────────────────────────────────────

/// Short autosave timing so tests do not wait a real minute.
pub const TEST_INTERVAL: Duration = Duration::from_secs(60);
pub const TEST_INITIAL_DELAY: Duration = Duration::from_secs(10);

pub struct SessionFixture {
    pub session: EditorSession,
    pub dir: TempDir,
}

/// Connect a session against the mock store with an isolated last-session
/// file.
pub fn connect_session(
    store: &Arc<MockStore>,
    hub: &HubHandle,
    window_name: &str,
) -> SessionFixture {
    connect_session_with(store, hub, window_name, false)
}

pub fn connect_session_with(
    store: &Arc<MockStore>,
    hub: &HubHandle,
    window_name: &str,
    resume: bool,
) -> SessionFixture {
    let dir = TempDir::new().unwrap();
    let mut options = SessionOptions::new(window_name);
    options.resume = resume;
    options.last_session_path = Some(dir.path().join("last-session.json"));
    options.autosave_interval = TEST_INTERVAL;
    options.autosave_initial_delay = TEST_INITIAL_DELAY;

    let session = EditorSession::connect(
        Arc::clone(store) as Arc<dyn ProjectStore>,
        &hub.addr,
        options,
    )
    .unwrap();
    SessionFixture { session, dir }
}

/// Pump a session until the condition holds, or panic on timeout. Events
/// drained along the way are accumulated and handed to the condition.
pub fn pump_until(
    session: &mut EditorSession,
    timeout: Duration,
    mut cond: impl FnMut(&EditorSession, &[CoordEvent]) -> bool,
) -> Vec<CoordEvent> {
    let start = Instant::now();
    let mut events = Vec::new();
    loop {
        events.extend(session.pump(Instant::now()));
        if cond(session, &events) {
            return events;
        }
        if start.elapsed() > timeout {
            panic!("timed out waiting for condition; events so far: {:?}", events);
        }
        thread::sleep(Duration::from_millis(5));
    }
}

/// Pump a session for a settle period and return everything drained.
pub fn pump_for(session: &mut EditorSession, period: Duration) -> Vec<CoordEvent> {
    let start = Instant::now();
    let mut events = Vec::new();
    while start.elapsed() < period {
        events.extend(session.pump(Instant::now()));
        thread::sleep(Duration::from_millis(5));
    }
    events
}

/// Pump two sessions in lockstep until the condition holds.
pub fn pump_pair_until(
    a: &mut EditorSession,
    b: &mut EditorSession,
    timeout: Duration,
    mut cond: impl FnMut(&EditorSession, &EditorSession) -> bool,
) {
    let start = Instant::now();
    loop {
        a.pump(Instant::now());
        b.pump(Instant::now());
        if cond(a, b) {
            return;
        }
        if start.elapsed() > timeout {
            panic!("timed out waiting for pair condition");
        }
        thread::sleep(Duration::from_millis(5));
    }
}
