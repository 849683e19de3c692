//! # beltane-core
//!
//! The composition state-synchronization and persistence coordinator:
//! everything that keeps one editor window's state durable, consistent
//! with its sibling windows, and saved without losing edits or
//! duplicating saves.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Instant;
//!
//! use beltane_core::{Config, EditorSession, SessionOptions};
//! use beltane_store::SqliteStore;
//!
//! let config = Config::load();
//! let store = Arc::new(SqliteStore::open("compositions.sqlite")?);
//! let mut session = EditorSession::connect(
//!     store,
//!     config.hub_addr(),
//!     SessionOptions::from_config("main-window", &config),
//! )?;
//!
//! // Create a project and edit it; every mutation persists its slice,
//! // broadcasts to sibling windows, and marks the window dirty.
//! let meta = session.create_composition("Song A", 120.0)?;
//! let mut e = session.edit()?;
//! let kick = e.parts.sequencer.add_track("Kick", &mut e.ctx)?;
//! e.parts.mixer.set_channel_volume(kick, 0.8, &mut e.ctx)?;
//!
//! // Drive the window's event loop: broadcasts in, save/load
//! // completions, leader election, autosave ticks.
//! for event in session.pump(Instant::now()) {
//!     // surface CoordEvent::{Loaded, LoadFailed, Saved, SaveFailed}
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`session`] — `EditorSession`, the per-window wiring and pump loop
//! - [`coordinator`] — composition lifecycle (create/load/delete/list/
//!   save), the save mutex with its pending-save marker, stale-completion
//!   generations
//! - [`distributor`] — all-or-nothing snapshot fan-out to the partitions
//! - [`partitions`] — sequencer, mixer, effects and samples slices with
//!   their mutators and broadcast absorption
//! - [`dirty`] — multi-subscriber change notification
//! - [`autosave`] — timer cadence over the coordinator's save path
//! - [`leader`] — cross-window autosave leader election over the bus
//! - [`history`] — version history listing, restore, autosave recovery
//! - [`config`] — TOML configuration (embedded defaults + user override)
//! - [`last_session`] — durable last-open composition for auto-resume

pub mod autosave;
pub mod config;
pub mod coordinator;
pub mod dirty;
pub mod distributor;
pub mod error;
pub mod history;
pub mod last_session;
pub mod leader;
pub mod partitions;
pub mod session;

pub use autosave::AutosaveScheduler;
pub use config::Config;
pub use coordinator::{
    CoordEvent, Coordinator, LifecyclePhase, PendingSave, SaveState, SavedNotice,
};
pub use dirty::{DirtyTracker, SubscriberId};
pub use error::CoreError;
pub use history::VersionHistory;
pub use last_session::{LastSession, LastSessionFile};
pub use leader::{LeaderClaim, LeaderElector};
pub use partitions::{
    EditContext, EffectsPartition, MixerPartition, PartitionSet, SamplesPartition,
    SequencerPartition,
};
pub use session::{Edit, EditorSession, SessionOptions};
