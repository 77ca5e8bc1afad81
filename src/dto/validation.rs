//! Validation helpers for DTOs.

use std::str::FromStr;

use validator::ValidationError;

use crate::state::room::RoomCode;

/// Validates that a room code is 5 alphanumeric characters (any case).
///
/// # Examples
///
/// ```ignore
/// validate_room_code("AB12C") // Ok
/// validate_room_code("ab12c") // Ok - normalized on parse
/// validate_room_code("AB1")   // Err - too short
/// ```
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if let Err(parse_err) = RoomCode::from_str(code) {
        let mut err = ValidationError::new("room_code");
        err.message = Some(parse_err.to_string().into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a display name is non-empty after trimming.
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("player_name");
        err.message = Some("player name must not be empty".into());
        return Err(err);
    }

    Ok(())
}
