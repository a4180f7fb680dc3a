//! Capability interface a manager exposes to reload reconciliation.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use harmony_core::AppResult;
use harmony_core::config::ReloadConfig;
use harmony_core::types::ManagerId;
use harmony_events::{
    HarmonyEventManager, HandlerClass, RegisterOutcome, RegisteredListener, ScopedEventManager,
};

use crate::error::ReconcileError;

/// Opaque reference to a live manager. Compared by [`ReloadTarget::id`].
pub type ManagerHandle = Arc<dyn ReloadTarget>;

/// What reconciliation needs from a manager.
pub trait ReloadTarget: Send + Sync + fmt::Debug {
    /// Identity issued when the manager was constructed.
    fn id(&self) -> ManagerId;

    /// Type names of the manager, its scopes, and its listener wrapper.
    fn shape(&self) -> TargetShape;

    /// Snapshot of the manager's scopes. Scope locks are not held.
    fn scopes(&self) -> AppResult<Vec<Arc<ScopedEventManager>>>;

    /// Re-registration entry point.
    fn reregister(&self, listener: &RegisteredListener) -> AppResult<()>;
}

/// Type names reported by a manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetShape {
    pub manager_type: String,
    pub scope_type: String,
    pub listener_type: String,
}

impl TargetShape {
    /// The shape of `harmony-events` managers.
    pub fn harmony() -> Self {
        Self {
            manager_type: type_name::<HarmonyEventManager>().to_string(),
            scope_type: type_name::<ScopedEventManager>().to_string(),
            listener_type: type_name::<RegisteredListener>().to_string(),
        }
    }
}

/// The shape a reconciliation job requires every registered manager to have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeContract {
    expected: TargetShape,
}

impl ShapeContract {
    /// Contract requiring `expected`.
    pub fn new(expected: TargetShape) -> Self {
        Self { expected }
    }

    /// Built-in contract with config overrides applied.
    pub fn from_config(config: &ReloadConfig) -> Self {
        let mut expected = TargetShape::harmony();
        if let Some(manager_type) = &config.manager_type {
            expected.manager_type = manager_type.clone();
        }
        if let Some(scope_type) = &config.scope_type {
            expected.scope_type = scope_type.clone();
        }
        if let Some(listener_type) = &config.listener_type {
            expected.listener_type = listener_type.clone();
        }
        Self { expected }
    }

    pub fn expected(&self) -> &TargetShape {
        &self.expected
    }

    /// Checks one manager against the contract.
    pub fn resolve(&self, class: &HandlerClass, target: &dyn ReloadTarget) -> Result<(), ReconcileError> {
        let actual = target.shape();
        let mismatch = [
            ("manager", &self.expected.manager_type, &actual.manager_type),
            ("scope", &self.expected.scope_type, &actual.scope_type),
            ("listener", &self.expected.listener_type, &actual.listener_type),
        ]
        .into_iter()
        .find(|(_, expected, actual)| expected != actual);

        match mismatch {
            None => Ok(()),
            Some((role, expected, actual)) => Err(ReconcileError::Resolution {
                class: class.clone(),
                detail: format!(
                    "manager {} has {role} type '{actual}', expected '{expected}'",
                    target.id()
                ),
            }),
        }
    }
}

impl Default for ShapeContract {
    fn default() -> Self {
        Self::new(TargetShape::harmony())
    }
}

impl ReloadTarget for HarmonyEventManager {
    fn id(&self) -> ManagerId {
        HarmonyEventManager::id(self)
    }

    fn shape(&self) -> TargetShape {
        TargetShape::harmony()
    }

    fn scopes(&self) -> AppResult<Vec<Arc<ScopedEventManager>>> {
        Ok(HarmonyEventManager::scopes(self)
            .into_iter()
            .map(|(_, scope)| scope)
            .collect())
    }

    fn reregister(&self, listener: &RegisteredListener) -> AppResult<()> {
        let outcome = self.register(listener);
        debug!(
            manager_id = %HarmonyEventManager::id(self),
            listener_id = %listener.id(),
            outcome = ?outcome,
            "Listener re-registered"
        );
        if outcome == RegisterOutcome::Unmapped {
            debug!(
                event_type = %listener.event_type(),
                "Re-registered listener has no mapping, routed through parent managers"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_contract_accepts_harmony_manager() {
        let manager = HarmonyEventManager::builder("demo").build();
        let class = HandlerClass::define("demo.Listener");

        ShapeContract::default()
            .resolve(&class, &*manager)
            .expect("harmony shape matches");
    }

    #[test]
    fn test_config_override_causes_resolution_error() {
        let config = ReloadConfig {
            scope_type: Some("other::Scope".to_string()),
            ..ReloadConfig::default()
        };
        let manager = HarmonyEventManager::builder("demo").build();
        let class = HandlerClass::define("demo.Listener");

        let err = ShapeContract::from_config(&config)
            .resolve(&class, &*manager)
            .expect_err("scope type differs");

        match err {
            ReconcileError::Resolution { class: c, detail } => {
                assert_eq!(c, class);
                assert!(detail.contains("scope type"));
                assert!(detail.contains("other::Scope"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
