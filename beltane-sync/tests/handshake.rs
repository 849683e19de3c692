mod common;

use std::time::Duration;

use beltane_sync::{SyncBus, WindowId};

#[test]
fn windows_get_increasing_ids() {
    let hub = common::spawn_hub();

    let a = SyncBus::connect(&hub.addr, "editor-a").unwrap();
    let b = SyncBus::connect(&hub.addr, "editor-b").unwrap();
    hub.wait_for_windows(2, Duration::from_secs(2));

    assert_eq!(a.window_id(), WindowId::new(0));
    assert_eq!(b.window_id(), WindowId::new(1));
}

#[test]
fn disconnect_detaches_window() {
    let hub = common::spawn_hub();

    let a = SyncBus::connect(&hub.addr, "editor-a").unwrap();
    let _b = SyncBus::connect(&hub.addr, "editor-b").unwrap();
    hub.wait_for_windows(2, Duration::from_secs(2));

    a.disconnect().unwrap();
    hub.wait_for_windows(1, Duration::from_secs(2));
}

#[test]
fn shutdown_reaches_all_windows() {
    let hub = common::spawn_hub();

    let mut a = SyncBus::connect(&hub.addr, "editor-a").unwrap();
    let mut b = SyncBus::connect(&hub.addr, "editor-b").unwrap();
    hub.wait_for_windows(2, Duration::from_secs(2));

    hub.request_shutdown();

    let start = std::time::Instant::now();
    while !(a.hub_shutdown() && b.hub_shutdown()) {
        assert!(start.elapsed() < Duration::from_secs(2), "shutdown never arrived");
        a.pump();
        b.pump();
        std::thread::sleep(Duration::from_millis(5));
    }
}
