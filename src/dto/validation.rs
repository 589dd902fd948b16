//! Validation helpers for DTOs.

use validator::ValidationError;

/// Number of characters in a room join code.
pub const ROOM_CODE_LENGTH: usize = 6;

/// Validates that a room code is exactly 6 uppercase alphanumeric characters.
///
/// # Examples
///
/// ```ignore
/// validate_room_code("AB12CD") // Ok
/// validate_room_code("ab12cd") // Err - lowercase
/// validate_room_code("AB12C")  // Err - too short
/// ```
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if code.chars().count() != ROOM_CODE_LENGTH {
        let mut err = ValidationError::new("room_code_length");
        err.message = Some(
            format!(
                "Room code must be exactly {ROOM_CODE_LENGTH} characters (got {})",
                code.chars().count()
            )
            .into(),
        );
        return Err(err);
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some("Room code must contain only uppercase letters and digits".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that every index in `selected` addresses one of `option_count` options.
pub fn validate_option_indices(
    selected: &[usize],
    option_count: usize,
) -> Result<(), ValidationError> {
    if let Some(index) = selected.iter().find(|index| **index >= option_count) {
        let mut err = ValidationError::new("option_index_out_of_range");
        err.message = Some(
            format!("Option index {index} is out of range ({option_count} options)").into(),
        );
        return Err(err);
    }

    Ok(())
}
