//! Construction hook: a process-wide callback run after a manager is built.

use std::sync::{Arc, OnceLock};

use tracing::{debug, info};

use harmony_core::{AppError, AppResult};

use crate::manager::HarmonyEventManager;

/// Callback invoked right after a [`HarmonyEventManager`] is constructed.
pub trait ConstructionHook: Send + Sync {
    /// Called once per constructed manager.
    fn on_constructed(&self, manager: &Arc<HarmonyEventManager>);
}

static CONSTRUCTION_HOOK: OnceLock<Arc<dyn ConstructionHook>> = OnceLock::new();

/// Installs the process-wide construction hook.
///
/// At most one hook can be installed per process. Managers built before
/// installation are not reported.
pub fn install_construction_hook(hook: Arc<dyn ConstructionHook>) -> AppResult<()> {
    CONSTRUCTION_HOOK
        .set(hook)
        .map_err(|_| AppError::conflict("A construction hook is already installed"))?;

    info!("Construction hook installed");
    Ok(())
}

pub(crate) fn notify_constructed(manager: &Arc<HarmonyEventManager>) {
    if let Some(hook) = CONSTRUCTION_HOOK.get() {
        debug!(manager_id = %manager.id(), "Running construction hook");
        hook.on_constructed(manager);
    }
}
