//! Change notification from the domain partitions to whoever cares.
//!
//! Any partition mutation calls `notify_changed()`; every registered
//! subscriber hears about it. The coordinator registers a callback that
//! raises its dirty flag, and other listeners can coexist without
//! clobbering each other's registration.

/// Handle for one registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberId(u64);

type ChangeCallback = Box<dyn Fn() + Send>;

#[derive(Default)]
pub struct DirtyTracker {
    subscribers: Vec<(SubscriberId, ChangeCallback)>,
    next_id: u64,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback invoked on every change notification.
    pub fn register(&mut self, callback: impl Fn() + Send + 'static) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a subscriber. Returns true if it was registered.
    pub fn unregister(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Report that some partition mutated.
    pub fn notify_changed(&self) {
        for (_, callback) in &self.subscribers {
            callback();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn all_subscribers_notified() {
        let mut tracker = DirtyTracker::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));

        let a_in = Arc::clone(&a);
        tracker.register(move || {
            a_in.fetch_add(1, Ordering::SeqCst);
        });
        let b_in = Arc::clone(&b);
        tracker.register(move || {
            b_in.fetch_add(1, Ordering::SeqCst);
        });

        tracker.notify_changed();
        tracker.notify_changed();

        assert_eq!(a.load(Ordering::SeqCst), 2);
        assert_eq!(b.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unregister_stops_notifications() {
        let mut tracker = DirtyTracker::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_in = Arc::clone(&count);
        let id = tracker.register(move || {
            count_in.fetch_add(1, Ordering::SeqCst);
        });

        tracker.notify_changed();
        assert!(tracker.unregister(id));
        assert!(!tracker.unregister(id));
        tracker.notify_changed();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn notify_with_no_subscribers_is_harmless() {
        let tracker = DirtyTracker::new();
        tracker.notify_changed();
        assert_eq!(tracker.subscriber_count(), 0);
    }
}
