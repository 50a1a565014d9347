//! Request field validation
//!
//! All failures are reported as `Error::InvalidInput` (HTTP 400).

use asigest_common::{Error, Result};

/// Require `min..=max` characters
pub fn length_between(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(Error::InvalidInput(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }
    Ok(())
}

/// Require a non-empty string of at most `max` characters
pub fn required(field: &str, value: &str, max: usize) -> Result<()> {
    length_between(field, value, 1, max)
}

/// Optional string of at most `max` characters
pub fn max_length(field: &str, value: Option<&str>, max: usize) -> Result<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(Error::InvalidInput(format!(
            "{} must be at most {} characters",
            field, max
        ))),
        _ => Ok(()),
    }
}

/// Optional quantity that must not be negative
pub fn non_negative(field: &str, value: Option<i64>) -> Result<()> {
    match value {
        Some(v) if v < 0 => Err(Error::InvalidInput(format!("{} must be >= 0", field))),
        _ => Ok(()),
    }
}

/// Optional value that must be strictly positive
pub fn positive(field: &str, value: Option<i64>) -> Result<()> {
    match value {
        Some(v) if v <= 0 => Err(Error::InvalidInput(format!("{} must be > 0", field))),
        _ => Ok(()),
    }
}
