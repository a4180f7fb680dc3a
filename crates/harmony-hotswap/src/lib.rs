//! # harmony-hotswap
//!
//! Keeps listener wiring consistent after a handler class is redefined at
//! runtime. Provides:
//!
//! - A process-wide, identity-keyed registry of live event managers
//! - A one-time installer for the reload-notification subscription
//! - The reconciliation job: traverse every manager's scopes under lock,
//!   find listeners whose handler class is exactly the redefined class,
//!   and re-register them with their manager
//! - The plugin glue invoked for every constructed manager

pub mod error;
pub mod installer;
pub mod notifier;
pub mod plugin;
pub mod reconciler;
pub mod registry;
pub mod target;
pub mod traversal;

pub use error::ReconcileError;
pub use installer::ReloadHookInstaller;
pub use notifier::{ReloadCallback, ReloadChannel, ReloadEvent, ReloadNotifier};
pub use plugin::HarmonyPlugin;
pub use reconciler::{ReconcileReport, ReloadListenersJob, ReloadReconciler};
pub use registry::{LiveManagerRegistry, StableView};
pub use target::{ManagerHandle, ReloadTarget, ShapeContract, TargetShape};
pub use traversal::{ScopeTraversal, TraversalMatch, TraversalStats};
