//! Notification plumbing: emitters, cancellable subscriptions and groups of them.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Listeners<E> {
    next_id: u64,
    entries: Vec<(u64, Listener<E>)>,
}

/// Multi-listener emitter for one kind of event.
///
/// Listeners may be registered and emitted from any thread. Emission calls a
/// snapshot of the listeners taken outside the lock, so a listener may
/// subscribe or cancel without deadlocking.
pub struct EventHub<E> {
    inner: Arc<Mutex<Listeners<E>>>,
}

impl<E> Default for EventHub<E> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }
}

impl<E> fmt::Debug for EventHub<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<E> EventHub<E> {
    /// Deliver an event to every registered listener.
    pub fn emit(&self, event: &E) {
        let listeners: Vec<Listener<E>> = self
            .inner
            .lock()
            .entries
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Number of live listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.lock().entries.len()
    }
}

impl<E: 'static> EventHub<E> {
    /// Create an emitter with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It stays registered until the returned
    /// [`Subscription`] is cancelled or dropped.
    #[must_use = "dropping the subscription unregisters the listener"]
    pub fn subscribe(&self, listener: impl Fn(&E) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.push((id, Arc::new(listener)));
            id
        };

        let weak: Weak<Mutex<Listeners<E>>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.lock().entries.retain(|(entry, _)| *entry != id);
            }
        })
    }

}

/// A cancellable registration. Cancels itself on drop.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap an arbitrary teardown action.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Unregister now. Calling it twice is harmless.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Whether the registration is still live.
    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Subscriptions created together and cancelled together.
#[derive(Debug, Default)]
pub struct SubscriptionGroup {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionGroup {
    /// Create an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscription to the group.
    pub fn add(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    /// Cancel every subscription and empty the group.
    pub fn cancel_all(&mut self) {
        for mut subscription in self.subscriptions.drain(..) {
            subscription.cancel();
        }
    }

    /// Number of subscriptions held.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether the group holds nothing.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl Drop for SubscriptionGroup {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn emit_reaches_listeners() {
        let hub = EventHub::<u32>::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&seen);
        let _sub = hub.subscribe(move |n| {
            s.fetch_add(*n as usize, Ordering::SeqCst);
        });
        hub.emit(&2);
        hub.emit(&3);
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn cancel_unregisters() {
        let hub = EventHub::<()>::new();
        let mut sub = hub.subscribe(|_| {});
        assert_eq!(hub.listener_count(), 1);
        sub.cancel();
        sub.cancel();
        assert_eq!(hub.listener_count(), 0);
        assert!(!sub.is_active());
    }

    #[test]
    fn drop_unregisters() {
        let hub = EventHub::<()>::new();
        {
            let _sub = hub.subscribe(|_| {});
            assert_eq!(hub.listener_count(), 1);
        }
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn group_cancels_everything() {
        let a = EventHub::<()>::new();
        let b = EventHub::<()>::new();
        let mut group = SubscriptionGroup::new();
        group.add(a.subscribe(|_| {}));
        group.add(a.subscribe(|_| {}));
        group.add(b.subscribe(|_| {}));
        assert_eq!(group.len(), 3);

        group.cancel_all();
        assert!(group.is_empty());
        assert_eq!(a.listener_count(), 0);
        assert_eq!(b.listener_count(), 0);
    }

    #[test]
    fn debug_reports_listener_count() {
        let hub = EventHub::<u8>::new();
        let _a = hub.subscribe(|_| {});
        let _b = hub.subscribe(|_| {});
        assert_eq!(format!("{hub:?}"), "EventHub { listeners: 2 }");
    }

    #[test]
    fn subscription_outliving_hub_is_harmless() {
        let hub = EventHub::<()>::new();
        let mut sub = hub.subscribe(|_| {});
        drop(hub);
        sub.cancel();
    }
}
