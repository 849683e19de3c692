//! Timer-driven autosave on top of the coordinator's save path.
//!
//! Pure `Instant` arithmetic driven from the window's pump loop: a
//! one-shot initial delay after a composition becomes active, then a
//! periodic tick. Every attempt goes through `Coordinator::request_autosave`,
//! which enforces the dirty/`is_saving` guards; this module owns only the
//! cadence, the enabled toggle, and the leadership gate.
//!
//! Failures are never surfaced here; the coordinator logs them and the
//! dirty flag stays set, so the next tick retries on its own.

use std::time::{Duration, Instant};

use log::debug;

use crate::config::Config;
use crate::coordinator::Coordinator;

pub struct AutosaveScheduler {
    enabled: bool,
    interval: Duration,
    initial_delay: Duration,
    /// When the current composition became active; None disarms both
    /// timers.
    armed_at: Option<Instant>,
    /// Last tick that passed the cadence check (attempted or not is the
    /// coordinator's business).
    last_tick: Option<Instant>,
}

impl AutosaveScheduler {
    pub fn new(config: &Config) -> Self {
        Self::with_timing(
            config.autosave_enabled(),
            config.autosave_interval(),
            config.autosave_initial_delay(),
        )
    }

    pub fn with_timing(enabled: bool, interval: Duration, initial_delay: Duration) -> Self {
        Self {
            enabled,
            interval,
            initial_delay,
            armed_at: None,
            last_tick: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable autosave. Disabling cancels both timers;
    /// re-enabling starts from scratch via a fresh `arm`.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.disarm();
        }
    }

    /// A composition became active: start the initial delay now.
    pub fn arm(&mut self, now: Instant) {
        self.armed_at = Some(now);
        self.last_tick = None;
        debug!("autosave armed");
    }

    /// No composition is active: cancel both timers.
    pub fn disarm(&mut self) {
        self.armed_at = None;
        self.last_tick = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed_at.is_some()
    }

    /// One scheduler turn. Attempts an autosave when the window is due:
    /// autosave enabled, armed past the initial delay, interval elapsed
    /// since the previous due tick, and this window holds the autosave
    /// leadership for its composition. Returns true if a save started.
    pub fn tick(&mut self, now: Instant, is_leader: bool, coordinator: &mut Coordinator) -> bool {
        if !self.enabled {
            return false;
        }
        let Some(armed_at) = self.armed_at else {
            return false;
        };
        if now < armed_at + self.initial_delay {
            return false;
        }
        let due = match self.last_tick {
            None => true,
            Some(last) => now >= last + self.interval,
        };
        if !due {
            return false;
        }
        self.last_tick = Some(now);

        if !is_leader {
            debug!("autosave tick skipped: not the leader window");
            return false;
        }
        coordinator.request_autosave()
    }
}
