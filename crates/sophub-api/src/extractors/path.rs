//! Typed path parameter helpers.

use uuid::Uuid;

use sophub_core::error::AppError;

/// Parse a version id from a path segment. Surrounding whitespace is
/// ignored.
pub fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    let trimmed = s.trim();
    Uuid::parse_str(trimmed)
        .map_err(|_| AppError::validation(format!("Invalid version id: {trimmed}")))
}
