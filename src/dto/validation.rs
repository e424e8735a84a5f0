//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::state::cycle::parse_clock_time;

/// Validates a wall-clock time in 24h `HH:MM` form.
///
/// # Examples
///
/// ```ignore
/// validate_clock_time("21:30") // Ok
/// validate_clock_time("9:30")  // Err - hour not zero-padded
/// validate_clock_time("24:00") // Err - hour out of range
/// ```
pub fn validate_clock_time(value: &str) -> Result<(), ValidationError> {
    if parse_clock_time(value).is_err() {
        let mut err = ValidationError::new("clock_time_format");
        err.message = Some(format!("expected a 24h HH:MM time, got `{value}`").into());
        return Err(err);
    }

    Ok(())
}

/// Validates a user identifier: 1-64 characters, letters, digits,
/// `-` and `_` only.
///
/// The character set matters beyond cosmetics: user ids become dotted
/// field paths in partial store updates, so separators like `.` must
/// never appear in them.
pub fn validate_user_id(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.len() > 64 {
        let mut err = ValidationError::new("user_id_length");
        err.message = Some(
            format!("user id must be between 1 and 64 characters (got {})", value.len()).into(),
        );
        return Err(err);
    }

    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
    {
        let mut err = ValidationError::new("user_id_format");
        err.message =
            Some("user id may contain only letters, digits, `-` and `_`".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_clock_time_valid() {
        assert!(validate_clock_time("00:00").is_ok());
        assert!(validate_clock_time("03:30").is_ok());
        assert!(validate_clock_time("23:59").is_ok());
    }

    #[test]
    fn test_validate_clock_time_invalid() {
        assert!(validate_clock_time("24:00").is_err()); // hour out of range
        assert!(validate_clock_time("9:30").is_err()); // not zero-padded
        assert!(validate_clock_time("21:3").is_err()); // minute too short
        assert!(validate_clock_time("tonight").is_err());
        assert!(validate_clock_time("").is_err());
    }

    #[test]
    fn test_validate_user_id_valid() {
        assert!(validate_user_id("ana").is_ok());
        assert!(validate_user_id("user_42").is_ok());
        assert!(validate_user_id("a-b-c").is_ok());
    }

    #[test]
    fn test_validate_user_id_invalid() {
        assert!(validate_user_id("").is_err()); // empty
        assert!(validate_user_id(&"x".repeat(65)).is_err()); // too long
        assert!(validate_user_id("ana.banana").is_err()); // dot would split a field path
        assert!(validate_user_id("ana banana").is_err()); // space
    }
}
