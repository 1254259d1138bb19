//! Enumerations stored as snake_case TEXT and the JSON request payloads
//! accepted by the HTTP layer.

pub mod ai;
pub mod bia;
pub mod compliance;
pub mod organization;
pub mod policy;
pub mod risk;
pub mod runbook;

use crate::error::NexusError;

pub(crate) fn require_text(field: &str, value: &str) -> Result<(), NexusError> {
    if value.trim().is_empty() {
        return Err(NexusError::validation(format!("`{field}` must not be blank")));
    }
    Ok(())
}

pub(crate) fn require_range(field: &str, value: i64, min: i64, max: i64) -> Result<(), NexusError> {
    if !(min..=max).contains(&value) {
        return Err(NexusError::validation(format!(
            "`{field}` must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}

pub(crate) fn require_non_negative(field: &str, value: f64) -> Result<(), NexusError> {
    if !value.is_finite() || value < 0.0 {
        return Err(NexusError::validation(format!(
            "`{field}` must be a non-negative number"
        )));
    }
    Ok(())
}
