//! Listener registry with cancellation handles.
//!
//! Every state change in the engine is pushed to the registered listeners.
//! [`Observers::subscribe`] hands back a [`Subscription`]; cancelling or
//! dropping it removes the listener. [`Observers::close`] drops everyone at
//! teardown and turns later subscriptions into inactive handles.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    closed: bool,
    listeners: Vec<(u64, Listener<T>)>,
}

impl<T> Registry<T> {
    fn contains(&self, id: u64) -> bool {
        self.listeners.iter().any(|(listener_id, _)| *listener_id == id)
    }
}

/// Shared set of listeners for values of type `T`.
///
/// Cloning yields another handle onto the same registry.
pub struct Observers<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Observers<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                closed: false,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register `listener`; it stays active until the returned handle is
    /// cancelled or dropped. Once the registry is closed the listener is
    /// discarded and the handle is inactive from the start.
    pub fn subscribe<F>(&self, listener: F) -> Subscription<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        if registry.closed {
            return Subscription {
                id: 0,
                registry: Weak::new(),
            };
        }
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Arc::new(listener)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `value` to every listener.
    ///
    /// Listeners run outside the registry lock, so one may cancel its own
    /// subscription, or another's, while being notified. Each listener is
    /// checked again right before it is called: one cancelled earlier in the
    /// same pass is skipped. A cancel racing from another thread can still
    /// overlap a call that has already begun.
    pub fn notify(&self, value: &T) {
        let listeners: Vec<(u64, Listener<T>)> = lock(&self.registry)
            .listeners
            .iter()
            .map(|(id, l)| (*id, Arc::clone(l)))
            .collect();
        for (id, listener) in listeners {
            if !lock(&self.registry).contains(id) {
                continue;
            }
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.registry).listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every listener and refuse new ones.
    pub fn close(&self) {
        let mut registry = lock(&self.registry);
        registry.closed = true;
        registry.listeners.clear();
    }
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Observers<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T> std::fmt::Debug for Observers<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers").field("len", &self.len()).finish()
    }
}

/// Cancellation handle returned by [`Observers::subscribe`].
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription<T> {
    id: u64,
    registry: Weak<Mutex<Registry<T>>>,
}

impl<T> Subscription<T> {
    /// Stop delivering to this listener. Calling it twice is harmless.
    pub fn cancel(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).listeners.retain(|(id, _)| *id != self.id);
        }
        self.registry = Weak::new();
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let active = lock(&registry).contains(self.id);
        active
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

fn lock<T>(registry: &Mutex<Registry<T>>) -> MutexGuard<'_, Registry<T>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}
