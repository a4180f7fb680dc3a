//! Reload reconciliation configuration.

use serde::{Deserialize, Serialize};

/// Overrides for the type shape a reconciliation job expects.
///
/// Each field, when set, replaces the type name the reconciler requires
/// registered managers to report. Unset fields keep the built-in
/// `harmony-events` type names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReloadConfig {
    /// Fully-qualified manager type name.
    #[serde(default)]
    pub manager_type: Option<String>,
    /// Fully-qualified scoped-manager type name.
    #[serde(default)]
    pub scope_type: Option<String>,
    /// Fully-qualified listener-wrapper type name.
    #[serde(default)]
    pub listener_type: Option<String>,
}
