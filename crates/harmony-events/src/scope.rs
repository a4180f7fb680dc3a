//! Scoped event manager: the listener collection of one scope.

use std::collections::HashSet;

use parking_lot::{Mutex, MutexGuard};

use harmony_core::types::ListenerId;

use crate::listener::RegisteredListener;

/// Listener collection of one scope.
///
/// Every read or write of the collection holds `listeners`' lock, for
/// dispatch-time access and for reload reconciliation alike.
#[derive(Debug, Default)]
pub struct ScopedEventManager {
    listeners: Mutex<Vec<RegisteredListener>>,
}

impl ScopedEventManager {
    /// Creates an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scope holding the given listeners.
    pub fn from_listeners(listeners: Vec<RegisteredListener>) -> Self {
        Self {
            listeners: Mutex::new(listeners),
        }
    }

    /// Acquires the scope lock.
    ///
    /// The guard must be dropped before acquiring any other scope's lock.
    pub fn lock(&self) -> MutexGuard<'_, Vec<RegisteredListener>> {
        self.listeners.lock()
    }

    /// Appends a listener.
    pub fn register(&self, listener: RegisteredListener) {
        self.listeners.lock().push(listener);
    }

    /// Removes a listener by id.
    pub fn unregister(&self, id: ListenerId) -> Option<RegisteredListener> {
        let mut listeners = self.listeners.lock();
        let index = listeners.iter().position(|l| l.id() == id)?;
        Some(listeners.remove(index))
    }

    /// Replaces a listener in place, returning the previous registration.
    pub fn replace(
        &self,
        id: ListenerId,
        replacement: RegisteredListener,
    ) -> Option<RegisteredListener> {
        let mut listeners = self.listeners.lock();
        let slot = listeners.iter_mut().find(|l| l.id() == id)?;
        Some(std::mem::replace(slot, replacement))
    }

    /// Returns a snapshot of all listeners.
    pub fn listeners(&self) -> Vec<RegisteredListener> {
        self.listeners.lock().clone()
    }

    /// Returns the routed listeners for one event type in dispatch sequence:
    /// before-modification listeners first, then by order.
    pub fn dispatch_targets(
        &self,
        event_type: &str,
        routed: &HashSet<ListenerId>,
    ) -> Vec<RegisteredListener> {
        let mut targets: Vec<RegisteredListener> = {
            let listeners = self.listeners.lock();
            listeners
                .iter()
                .filter(|l| l.event_type() == event_type && routed.contains(&l.id()))
                .cloned()
                .collect()
        };

        targets.sort_by_key(|l| (!l.is_before_modifications(), l.order()));
        targets
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }
}
