//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a username is 2 to 20 characters of letters, digits,
/// underscores, or hyphens.
///
/// # Examples
///
/// ```ignore
/// validate_username("debater_01") // Ok
/// validate_username("a")          // Err - too short
/// validate_username("two words")  // Err - whitespace
/// ```
pub fn validate_username(name: &str) -> Result<(), ValidationError> {
    let length = name.chars().count();
    if !(2..=20).contains(&length) {
        let mut err = ValidationError::new("username_length");
        err.message =
            Some(format!("Username must be 2 to 20 characters (got {length})").into());
        return Err(err);
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        let mut err = ValidationError::new("username_format");
        err.message =
            Some("Username may only contain letters, digits, underscores, and hyphens".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username_valid() {
        assert!(validate_username("ab").is_ok());
        assert!(validate_username("debater_01").is_ok());
        assert!(validate_username("Jo-Anne").is_ok());
        assert!(validate_username("아고라").is_ok()); // non-ASCII letters count as letters
    }

    #[test]
    fn test_validate_username_invalid_length() {
        assert!(validate_username("a").is_err()); // too short
        assert!(validate_username("").is_err()); // empty
        assert!(validate_username(&"x".repeat(21)).is_err()); // too long
    }

    #[test]
    fn test_validate_username_invalid_format() {
        assert!(validate_username("two words").is_err()); // whitespace
        assert!(validate_username("tab\tname").is_err()); // control character
        assert!(validate_username("semi;colon").is_err()); // punctuation
        assert!(validate_username("at@sign").is_err()); // punctuation
    }
}
