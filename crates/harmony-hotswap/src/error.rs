//! Reconciliation error taxonomy.

use harmony_core::error::{AppError, ErrorKind};
use harmony_core::types::{ListenerId, ManagerId};
use harmony_events::HandlerClass;

/// Failure of one reconciliation job. Every variant carries the class the
/// job was reconciling.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// A registered manager does not have the shape the job requires.
    #[error("Cannot resolve reload shape for {class}: {detail}")]
    Resolution { class: HandlerClass, detail: String },

    /// A manager's scope map could not be read.
    #[error("Cannot read scopes of manager {manager} for {class}: {source}")]
    Access {
        class: HandlerClass,
        manager: ManagerId,
        #[source]
        source: AppError,
    },

    /// Re-registering a matched listener failed.
    #[error("Re-registering listener {listener} on manager {manager} for {class} failed: {source}")]
    Invocation {
        class: HandlerClass,
        manager: ManagerId,
        listener: ListenerId,
        #[source]
        source: AppError,
    },
}

impl ReconcileError {
    /// Returns the class the failed job was reconciling.
    pub fn class(&self) -> &HandlerClass {
        match self {
            Self::Resolution { class, .. }
            | Self::Access { class, .. }
            | Self::Invocation { class, .. } => class,
        }
    }
}

impl From<ReconcileError> for AppError {
    fn from(err: ReconcileError) -> Self {
        AppError::with_source(ErrorKind::Reload, err.to_string(), err)
    }
}
