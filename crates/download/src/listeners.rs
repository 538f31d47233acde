//! Observer registry for task list changes

use crate::task::DownloadTask;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Callback receiving the full task list after every change
pub type Listener = Arc<dyn Fn(&[DownloadTask]) + Send + Sync>;

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
}

impl ListenerRegistry {
    pub(crate) fn subscribe(self: &Arc<Self>, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, listener));
        debug!(listener_id = id, "download listener subscribed");
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    fn unsubscribe(&self, id: u64) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        before != listeners.len()
    }

    /// Call every listener registered at the time of the call.
    ///
    /// The lock is released before any callback runs, so listeners may
    /// subscribe, unsubscribe or trigger further notifications.
    pub(crate) fn notify(&self, tasks: &[DownloadTask]) {
        let snapshot: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            listener(tasks);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.lock().len()
    }
}

/// Registration returned by `subscribe`.
///
/// Dropping it leaves the listener registered; call [`unsubscribe`]
/// to remove it.
///
/// [`unsubscribe`]: Subscription::unsubscribe
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    /// Deregister the listener. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => {
                let removed = registry.unsubscribe(self.id);
                debug!(listener_id = self.id, removed, "download listener unsubscribed");
                removed
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_listener(count: &Arc<AtomicUsize>) -> Listener {
        let count = Arc::clone(count);
        Arc::new(move |_tasks: &[DownloadTask]| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_all_listeners_fire_independently() {
        let registry = Arc::new(ListenerRegistry::default());
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let sub = registry.subscribe(counter_listener(&first));
        let _keep = registry.subscribe(counter_listener(&second));

        registry.notify(&[]);
        assert!(sub.unsubscribe());
        registry.notify(&[]);

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_listener_may_mutate_registry_during_notify() {
        let registry = Arc::new(ListenerRegistry::default());
        let late = Arc::new(AtomicUsize::new(0));

        let inner_registry = Arc::clone(&registry);
        let late_listener = counter_listener(&late);
        let _sub = registry.subscribe(Arc::new(move |_tasks: &[DownloadTask]| {
            // Registered mid-notification: must not fire for this round
            let _ = inner_registry.subscribe(Arc::clone(&late_listener));
        }));

        registry.notify(&[]);
        assert_eq!(late.load(Ordering::SeqCst), 0);
        assert_eq!(registry.len(), 2);

        registry.notify(&[]);
        assert_eq!(late.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_after_registry_dropped() {
        let registry = Arc::new(ListenerRegistry::default());
        let sub = registry.subscribe(Arc::new(|_tasks: &[DownloadTask]| {}));
        drop(registry);
        assert!(!sub.unsubscribe());
    }
}
