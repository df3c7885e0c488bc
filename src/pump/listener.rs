//! Listener registry
//!
//! Broadcasts iterate over a snapshot, so a callback may add or remove
//! listeners (including itself) without deadlocking.

use crate::message::Message;
use parking_lot::Mutex;
use std::sync::Arc;

/// Observer of pump events
pub trait PortListener: Send + Sync {
    /// The connection failed; the pump has stopped its loops
    fn disconnected(&self);

    fn message_received(&self, msg: &Message);

    fn message_sent(&self, msg: &Message);
}

fn same(a: &Arc<dyn PortListener>, b: &Arc<dyn PortListener>) -> bool {
    // Compare data pointers only, vtable pointers may differ across codegen units
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

#[derive(Default)]
pub struct ListenerSet {
    listeners: Mutex<Vec<Arc<dyn PortListener>>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener, returns `false` if it was already registered
    pub fn add(&self, listener: Arc<dyn PortListener>) -> bool {
        let mut listeners = self.listeners.lock();
        if listeners.iter().any(|l| same(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Unregister a listener, returns `false` if it was not registered
    pub fn remove(&self, listener: &Arc<dyn PortListener>) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| !same(l, listener));
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Arc<dyn PortListener>> {
        self.listeners.lock().clone()
    }

    pub fn notify_disconnected(&self) {
        for listener in self.snapshot() {
            listener.disconnected();
        }
    }

    pub fn notify_received(&self, msg: &Message) {
        for listener in self.snapshot() {
            listener.message_received(msg);
        }
    }

    pub fn notify_sent(&self, msg: &Message) {
        for listener in self.snapshot() {
            listener.message_sent(msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Weak;

    #[derive(Default)]
    struct Counter {
        received: AtomicUsize,
    }

    impl PortListener for Counter {
        fn disconnected(&self) {}
        fn message_received(&self, _msg: &Message) {
            self.received.fetch_add(1, Ordering::SeqCst);
        }
        fn message_sent(&self, _msg: &Message) {}
    }

    /// Removes itself and registers a new counter on first message
    struct SelfRemoving {
        set: Weak<ListenerSet>,
        me: Mutex<Option<Arc<dyn PortListener>>>,
        added: Arc<Counter>,
    }

    impl PortListener for SelfRemoving {
        fn disconnected(&self) {}
        fn message_received(&self, _msg: &Message) {
            let Some(set) = self.set.upgrade() else {
                return;
            };
            if let Some(me) = self.me.lock().take() {
                set.remove(&me);
                set.add(self.added.clone());
            }
        }
        fn message_sent(&self, _msg: &Message) {}
    }

    #[test]
    fn test_add_remove() {
        let set = ListenerSet::new();
        let counter: Arc<dyn PortListener> = Arc::new(Counter::default());

        assert!(set.add(counter.clone()));
        assert!(!set.add(counter.clone()));
        assert_eq!(set.len(), 1);
        assert!(set.remove(&counter));
        assert!(!set.remove(&counter));
        assert!(set.is_empty());
    }

    #[test]
    fn test_each_listener_notified_once() {
        let set = ListenerSet::new();
        let a = Arc::new(Counter::default());
        let b = Arc::new(Counter::default());
        set.add(a.clone());
        set.add(b.clone());

        set.notify_received(&Message::new(vec![0x02]));

        assert_eq!(a.received.load(Ordering::SeqCst), 1);
        assert_eq!(b.received.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_may_modify_set() {
        let set = Arc::new(ListenerSet::new());
        let added = Arc::new(Counter::default());
        let listener = Arc::new(SelfRemoving {
            set: Arc::downgrade(&set),
            me: Mutex::new(None),
            added: added.clone(),
        });
        let as_dyn: Arc<dyn PortListener> = listener.clone();
        *listener.me.lock() = Some(as_dyn.clone());
        set.add(as_dyn);

        set.notify_received(&Message::new(vec![0x01]));
        // The new listener joins after the snapshot was taken
        assert_eq!(added.received.load(Ordering::SeqCst), 0);
        assert_eq!(set.len(), 1);

        set.notify_received(&Message::new(vec![0x02]));
        assert_eq!(added.received.load(Ordering::SeqCst), 1);
    }
}
