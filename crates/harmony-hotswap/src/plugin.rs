//! Plugin glue: every constructed manager passes through here.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info};

use harmony_events::{ConstructionHook, HandlerClass, HarmonyEventManager};
use harmony_worker::JobScheduler;

use crate::error::ReconcileError;
use crate::installer::ReloadHookInstaller;
use crate::notifier::{ReloadCallback, ReloadEvent, ReloadNotifier};
use crate::reconciler::{ReconcileReport, ReloadListenersJob, ReloadReconciler};
use crate::registry::LiveManagerRegistry;
use crate::target::{ManagerHandle, ShapeContract};

/// Hot-swap plugin: owns the live registry and the reload subscription.
pub struct HarmonyPlugin {
    registry: Arc<LiveManagerRegistry>,
    installer: ReloadHookInstaller,
    notifier: Arc<dyn ReloadNotifier>,
    scheduler: Arc<dyn JobScheduler>,
    contract: ShapeContract,
}

impl fmt::Debug for HarmonyPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarmonyPlugin")
            .field("managers", &self.registry.len())
            .field("hook_installed", &self.installer.is_installed())
            .field("notifier", &self.notifier)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl HarmonyPlugin {
    pub fn new(
        notifier: Arc<dyn ReloadNotifier>,
        scheduler: Arc<dyn JobScheduler>,
        contract: ShapeContract,
    ) -> Self {
        Self {
            registry: Arc::new(LiveManagerRegistry::new()),
            installer: ReloadHookInstaller::new(),
            notifier,
            scheduler,
            contract,
        }
    }

    /// Tracks a newly constructed manager.
    ///
    /// The first call subscribes to reload notifications; concurrent first
    /// calls wait for that subscription before registering their manager.
    pub fn register_manager(&self, handle: ManagerHandle) {
        let installed = self.installer.try_install(|| self.subscribe());
        if installed {
            info!("Reload hook installed");
        }

        let id = handle.id();
        if !self.registry.add(handle) {
            debug!(manager_id = %id, "Manager already registered");
        }
    }

    fn subscribe(&self) {
        let reconciler = self.reconciler();
        let scheduler = Arc::clone(&self.scheduler);

        let callback: ReloadCallback = Arc::new(move |event: &ReloadEvent| {
            let job = ReloadListenersJob::new(reconciler.clone(), event.class.clone());
            if let Err(e) = scheduler.schedule(Box::new(job)) {
                error!(class = %event.class, error = %e, "Failed to schedule listener reload");
            }
        });

        self.notifier.subscribe(callback);
    }

    /// A reconciler over this plugin's registry.
    pub fn reconciler(&self) -> ReloadReconciler {
        ReloadReconciler::new(Arc::clone(&self.registry), self.contract.clone())
    }

    /// Reconciles synchronously on the calling thread.
    pub fn reconcile_now(&self, class: &HandlerClass) -> Result<ReconcileReport, ReconcileError> {
        self.reconciler().reconcile(class)
    }

    pub fn registry(&self) -> &Arc<LiveManagerRegistry> {
        &self.registry
    }

    pub fn is_hook_installed(&self) -> bool {
        self.installer.is_installed()
    }
}

impl ConstructionHook for HarmonyPlugin {
    fn on_constructed(&self, manager: &Arc<HarmonyEventManager>) {
        self.register_manager(manager.clone());
    }
}
