//! Synchronous listener registry with per-listener failure isolation.
//!
//! Every `emit` delivers to a snapshot of the listeners registered at that
//! moment, in registration order. A listener that panics is logged and
//! skipped; the remaining listeners still receive the value and the
//! publisher never sees the failure. Listeners may subscribe or unsubscribe
//! from inside a callback; the change applies from the next `emit`.

use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tracing::{debug, error};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    listeners: Vec<(u64, Listener<T>)>,
}

impl<T> Registry<T> {
    fn remove(&mut self, id: u64) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        before != self.listeners.len()
    }
}

/// Ordered set of callbacks for one kind of value
pub struct ListenerSet<T> {
    name: &'static str,
    registry: Arc<RwLock<Registry<T>>>,
}

impl<T: 'static> ListenerSet<T> {
    /// Create an empty set; `name` only appears in logs
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            registry: Arc::new(RwLock::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register a callback; keep the returned handle to remove it later
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = self.registry.write();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.push((id, Arc::new(listener)));
            id
        };
        debug!(listeners = self.name, id, "listener registered");

        let weak: Weak<RwLock<Registry<T>>> = Arc::downgrade(&self.registry);
        Subscription {
            id,
            cancel: Some(Box::new(move |id| match weak.upgrade() {
                Some(registry) => registry.write().remove(id),
                None => false,
            })),
        }
    }

    /// Deliver `value` to every current listener; returns how many completed
    pub fn emit(&self, value: &T) -> usize {
        let snapshot: Vec<Listener<T>> = self
            .registry
            .read()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        let mut delivered = 0;
        for listener in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(value))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    error!(
                        listeners = self.name,
                        error = %panic_message(payload.as_ref()),
                        "listener failed while handling value"
                    );
                }
            }
        }
        delivered
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.registry.read().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every listener; outstanding subscriptions become no-ops
    pub fn clear(&self) {
        self.registry.write().listeners.clear();
    }
}

impl<T> fmt::Debug for ListenerSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("name", &self.name)
            .field("listeners", &self.registry.read().listeners.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Handle returned by [`ListenerSet::subscribe`].
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    id: u64,
    cancel: Option<Box<dyn FnOnce(u64) -> bool + Send + Sync>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the listener; false if it was already gone
    pub fn unsubscribe(mut self) -> bool {
        match self.cancel.take() {
            Some(cancel) => cancel(self.id),
            None => false,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_delivery_in_registration_order() {
        let set = ListenerSet::<u32>::new("test");
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let seen = Arc::clone(&seen);
            set.subscribe(move |value: &u32| seen.lock().push(format!("{tag}{value}")));
        }

        assert_eq!(set.emit(&7), 3);
        assert_eq!(*seen.lock(), vec!["a7", "b7", "c7"]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let set = ListenerSet::<u32>::new("test");
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let subscription = set.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        set.emit(&1);
        assert!(subscription.unsubscribe());
        set.emit(&2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let set = ListenerSet::<u32>::new("test");
        let count = Arc::new(AtomicUsize::new(0));

        set.subscribe(|_| panic!("listener bug"));
        let counter = Arc::clone(&count);
        set.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(set.emit(&1), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscribe_from_inside_listener() {
        let set = Arc::new(ListenerSet::<u32>::new("test"));
        let inner = Arc::clone(&set);
        set.subscribe(move |_| {
            inner.subscribe(|_| {});
        });

        assert_eq!(set.emit(&1), 1);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_unsubscribe_after_set_dropped() {
        let set = ListenerSet::<u32>::new("test");
        let subscription = set.subscribe(|_| {});
        drop(set);
        assert!(!subscription.unsubscribe());
    }
}
