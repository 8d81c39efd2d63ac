//! Room identifier validation
//!
//! Room ids are short opaque strings chosen by the sender and shared with the
//! receiver inside the link. They travel in URL paths, so they are limited to
//! URL-safe ASCII.

/// Maximum length for room ids in characters
pub const MAX_ROOM_ID_LENGTH: usize = 64;

/// Length of room ids produced by [`generate_room_id`]
pub const GENERATED_ROOM_ID_LENGTH: usize = 8;

/// Validation error for room ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomIdError {
    /// Room id is empty
    Empty,
    /// Room id exceeds maximum length
    TooLong,
    /// Room id contains characters other than ASCII alphanumerics, `-` and `_`
    InvalidCharacters,
}

impl std::fmt::Display for RoomIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "room id is required"),
            Self::TooLong => write!(f, "room id exceeds {} characters", MAX_ROOM_ID_LENGTH),
            Self::InvalidCharacters => write!(f, "room id contains invalid characters"),
        }
    }
}

impl std::error::Error for RoomIdError {}

/// Validate a room id
///
/// # Errors
///
/// Returns a `RoomIdError` variant describing the validation failure.
///
/// # Examples
///
/// ```
/// use dropwire_common::validators::{validate_room_id, RoomIdError};
///
/// assert!(validate_room_id("abc123").is_ok());
/// assert!(validate_room_id("3f9c-a_01").is_ok());
///
/// assert_eq!(validate_room_id(""), Err(RoomIdError::Empty));
/// assert_eq!(validate_room_id("has space"), Err(RoomIdError::InvalidCharacters));
/// ```
pub fn validate_room_id(room_id: &str) -> Result<(), RoomIdError> {
    if room_id.is_empty() {
        return Err(RoomIdError::Empty);
    }

    if room_id.len() > MAX_ROOM_ID_LENGTH {
        return Err(RoomIdError::TooLong);
    }

    if !room_id
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(RoomIdError::InvalidCharacters);
    }

    Ok(())
}

/// Generate a fresh room id
///
/// The first [`GENERATED_ROOM_ID_LENGTH`] hex digits of a random v4 UUID.
#[must_use]
pub fn generate_room_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(GENERATED_ROOM_ID_LENGTH);
    id
}
