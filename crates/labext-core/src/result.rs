//! Convenience result type alias for LabExtended.

use crate::error::AppError;

/// A specialized `Result` type for LabExtended operations.
pub type AppResult<T> = Result<T, AppError>;
