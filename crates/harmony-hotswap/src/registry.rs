//! Live manager registry: every manager constructed in this process.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use parking_lot::Mutex;
use tracing::debug;

use harmony_core::types::ManagerId;

use crate::target::ManagerHandle;

/// Identity-keyed set of live managers.
///
/// Entries are never removed. The registry-wide lock is always acquired
/// before any scope lock.
#[derive(Debug, Default)]
pub struct LiveManagerRegistry {
    managers: Mutex<HashMap<ManagerId, ManagerHandle>>,
}

impl LiveManagerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a manager unless the same instance is already present.
    ///
    /// Returns whether the manager was inserted. Blocks while a stable
    /// view is held.
    pub fn add(&self, handle: ManagerHandle) -> bool {
        let id = handle.id();
        let mut managers = self.managers.lock();

        match managers.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(handle);
                debug!(manager_id = %id, registered = managers.len(), "Manager registered for reload");
                true
            }
        }
    }

    /// Runs `f` with a consistent view of the current members. Concurrent
    /// `add` calls wait until `f` returns.
    pub fn with_stable_view<R>(&self, f: impl FnOnce(&StableView<'_>) -> R) -> R {
        let managers = self.managers.lock();
        f(&StableView {
            managers: &managers,
        })
    }

    pub fn contains(&self, id: ManagerId) -> bool {
        self.managers.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.managers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.lock().is_empty()
    }
}

/// Members of the registry while its lock is held.
#[derive(Debug)]
pub struct StableView<'a> {
    managers: &'a HashMap<ManagerId, ManagerHandle>,
}

impl<'a> StableView<'a> {
    /// Iterates the members in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &'a ManagerHandle> + 'a {
        self.managers.values()
    }

    pub fn get(&self, id: ManagerId) -> Option<&'a ManagerHandle> {
        self.managers.get(&id)
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}
