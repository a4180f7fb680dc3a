//! Scope traversal: find listeners whose handler class is exactly a given
//! class identity.
//!
//! Each scope is visited with its lock held; the lock is released before
//! the next scope is locked. Callers hold the registry lock for the whole
//! traversal, which keeps lock order registry -> scope.

use tracing::trace;

use harmony_core::types::ManagerId;
use harmony_events::{HandlerClass, RegisteredListener};

use crate::error::ReconcileError;
use crate::registry::StableView;
use crate::target::ManagerHandle;

/// One listener found by a traversal.
#[derive(Debug, Clone)]
pub struct TraversalMatch {
    /// Manager owning the scope the listener was found in.
    pub manager_id: ManagerId,
    /// The matched listener.
    pub listener: RegisteredListener,
}

/// Counters of one traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub managers: usize,
    pub scopes: usize,
    pub matches: usize,
}

/// Traversal entry points.
#[derive(Debug)]
pub struct ScopeTraversal;

impl ScopeTraversal {
    /// Visits every listener of every scope of `managers`, calling
    /// `on_match` with the scope lock held for each listener whose handler
    /// class identity equals `class`.
    ///
    /// Stops at the first error.
    pub fn visit<'a, I, F>(
        managers: I,
        class: &HandlerClass,
        mut on_match: F,
    ) -> Result<TraversalStats, ReconcileError>
    where
        I: IntoIterator<Item = &'a ManagerHandle>,
        F: FnMut(&ManagerHandle, &RegisteredListener) -> Result<(), ReconcileError>,
    {
        let mut stats = TraversalStats::default();

        for manager in managers {
            let scopes = manager.scopes().map_err(|source| ReconcileError::Access {
                class: class.clone(),
                manager: manager.id(),
                source,
            })?;
            stats.managers += 1;

            for scope in scopes {
                let listeners = scope.lock();
                stats.scopes += 1;

                for listener in listeners.iter() {
                    if listener.handle_class() != class {
                        continue;
                    }

                    trace!(
                        manager_id = %manager.id(),
                        listener_id = %listener.id(),
                        class = %class,
                        "Listener matches reloaded class"
                    );
                    on_match(manager, listener)?;
                    stats.matches += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Collects every matching (manager, listener) pair without acting on it.
    pub fn find_matches(
        view: &StableView<'_>,
        class: &HandlerClass,
    ) -> Result<Vec<TraversalMatch>, ReconcileError> {
        let mut matches = Vec::new();

        Self::visit(view.iter(), class, |manager, listener| {
            matches.push(TraversalMatch {
                manager_id: manager.id(),
                listener: listener.clone(),
            });
            Ok(())
        })?;

        Ok(matches)
    }
}
