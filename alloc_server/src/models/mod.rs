//! Data models for employees, projects and allocations.

pub mod allocation;
pub mod employee;
pub mod project;

use crate::error::AppError;

/// Maximum length, in characters, of names and skill strings.
pub const MAX_TEXT_LEN: usize = 100;

/// Check that a free-text field is non-empty and at most [`MAX_TEXT_LEN`] characters.
pub(crate) fn check_text(field: &str, value: &str) -> Result<(), AppError> {
    let len = value.chars().count();
    if len == 0 {
        return Err(AppError::InvalidInput(format!("{field} must not be empty")));
    }
    if len > MAX_TEXT_LEN {
        return Err(AppError::InvalidInput(format!(
            "{field} must be at most {MAX_TEXT_LEN} characters (got {len})"
        )));
    }
    Ok(())
}
