#![allow(dead_code)]
//! Test harness utilities for beltane-sync integration tests.
//!
//! The hub runs on a background thread (as it would in a real deployment)
//! because `SyncBus::connect` blocks until the hub answers the handshake.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use beltane_sync::{SyncBus, SyncHub};

pub struct HubHandle {
    pub addr: String,
    windows: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
}

impl HubHandle {
    /// Poll until the hub reports `expected` attached windows.
    pub fn wait_for_windows(&self, expected: usize, timeout: Duration) {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if self.windows.load(Ordering::SeqCst) == expected {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!(
            "timed out waiting for {} windows (have {})",
            expected,
            self.windows.load(Ordering::SeqCst)
        );
    }

    /// Ask the hub thread to broadcast shutdown and exit.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

/// Bind a hub on an ephemeral port and drive it from a background thread.
pub fn spawn_hub() -> HubHandle {
    let mut hub = SyncHub::bind("127.0.0.1:0").unwrap();
    let addr = hub.local_addr().unwrap().to_string();

    let windows = Arc::new(AtomicUsize::new(0));
    let shutdown = Arc::new(AtomicBool::new(false));

    let windows_in = Arc::clone(&windows);
    let shutdown_in = Arc::clone(&shutdown);
    thread::spawn(move || loop {
        hub.accept_connections();
        hub.pump();
        windows_in.store(hub.window_count(), Ordering::SeqCst);
        if shutdown_in.load(Ordering::SeqCst) {
            hub.broadcast_shutdown();
            break;
        }
        thread::sleep(Duration::from_millis(2));
    });

    HubHandle {
        addr,
        windows,
        shutdown,
    }
}

/// Pump the given windows until the condition holds, or panic on timeout.
pub fn pump_until(
    buses: &mut [&mut SyncBus],
    timeout: Duration,
    mut cond: impl FnMut() -> bool,
) {
    let start = Instant::now();
    while start.elapsed() < timeout {
        for bus in buses.iter_mut() {
            bus.pump();
        }
        if cond() {
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("timed out waiting for condition");
}

/// Pump windows for a fixed settle period (to assert that nothing arrives).
pub fn pump_for(buses: &mut [&mut SyncBus], period: Duration) {
    let start = Instant::now();
    while start.elapsed() < period {
        for bus in buses.iter_mut() {
            bus.pump();
        }
        thread::sleep(Duration::from_millis(5));
    }
}
