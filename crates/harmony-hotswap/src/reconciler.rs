//! Reload reconciliation: re-register every listener whose handler class
//! is exactly the class that was just redefined.

use std::sync::Arc;

use tracing::{debug, error, info};

use harmony_events::HandlerClass;
use harmony_worker::{Job, JobExecutionError};

use crate::error::ReconcileError;
use crate::registry::LiveManagerRegistry;
use crate::target::ShapeContract;
use crate::traversal::{ScopeTraversal, TraversalStats};

/// Outcome of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// The redefined class.
    pub class: HandlerClass,
    /// Whether at least one listener was re-registered.
    pub found: bool,
    /// Number of listeners re-registered.
    pub refreshed: usize,
    /// Number of managers traversed.
    pub managers: usize,
    /// Number of scopes traversed.
    pub scopes: usize,
}

/// Runs the reconciliation algorithm against a registry.
#[derive(Debug, Clone)]
pub struct ReloadReconciler {
    registry: Arc<LiveManagerRegistry>,
    contract: ShapeContract,
}

impl ReloadReconciler {
    pub fn new(registry: Arc<LiveManagerRegistry>, contract: ShapeContract) -> Self {
        Self { registry, contract }
    }

    /// Reconciles all live managers with the redefined `class`.
    ///
    /// Every manager is checked against the shape contract before anything
    /// is re-registered, all while the registry lock is held.
    pub fn reconcile(&self, class: &HandlerClass) -> Result<ReconcileReport, ReconcileError> {
        let stats = self.registry.with_stable_view(|view| {
            for manager in view.iter() {
                self.contract.resolve(class, manager.as_ref())?;
            }

            ScopeTraversal::visit(view.iter(), class, |manager, listener| {
                manager
                    .reregister(listener)
                    .map_err(|source| ReconcileError::Invocation {
                        class: class.clone(),
                        manager: manager.id(),
                        listener: listener.id(),
                        source,
                    })
            })
        })?;

        let report = self.report(class, stats);
        if report.found {
            info!(
                class = %class,
                refreshed = report.refreshed,
                "Successfully refreshed listeners"
            );
        } else {
            debug!(
                class = %class,
                managers = report.managers,
                scopes = report.scopes,
                "No listeners matched reloaded class"
            );
        }

        Ok(report)
    }

    fn report(&self, class: &HandlerClass, stats: TraversalStats) -> ReconcileReport {
        ReconcileReport {
            class: class.clone(),
            found: stats.matches > 0,
            refreshed: stats.matches,
            managers: stats.managers,
            scopes: stats.scopes,
        }
    }
}

/// The job scheduled once per reload notification.
#[derive(Debug)]
pub struct ReloadListenersJob {
    reconciler: ReloadReconciler,
    class: HandlerClass,
}

impl ReloadListenersJob {
    pub fn new(reconciler: ReloadReconciler, class: HandlerClass) -> Self {
        Self { reconciler, class }
    }

    pub fn class(&self) -> &HandlerClass {
        &self.class
    }
}

impl Job for ReloadListenersJob {
    fn job_type(&self) -> &str {
        "reload_listeners"
    }

    /// Reconciliation failures end here: they are logged with the class and
    /// never reach the scheduler.
    fn execute(&self) -> Result<(), JobExecutionError> {
        if let Err(e) = self.reconciler.reconcile(&self.class) {
            error!(class = %e.class(), error = %e, "Error refreshing listeners");
        }
        Ok(())
    }
}
