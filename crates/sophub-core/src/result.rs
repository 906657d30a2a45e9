//! Convenience result type alias for SOP Hub.

use crate::error::AppError;

/// A specialized `Result` type for SOP Hub operations.
pub type AppResult<T> = Result<T, AppError>;
