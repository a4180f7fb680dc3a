//! Convenience result type alias for Harmony.

use crate::error::AppError;

/// A specialized `Result` type for Harmony operations.
pub type AppResult<T> = Result<T, AppError>;
