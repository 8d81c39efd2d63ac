//! Error message functions for handlers
//!
//! Each returns the human-readable half of an `error` event; the
//! machine-readable half is a [`RelayErrorKind`](dropwire_common::RelayErrorKind).

use dropwire_common::validators::RoomIdError;

/// "roomId is required"
pub fn err_room_required() -> String {
    "roomId is required".to_string()
}

/// Malformed room id
pub fn err_invalid_room(error: &RoomIdError) -> String {
    format!("invalid roomId: {}", error)
}

/// Missing negotiation payload
pub fn err_payload_required(command: &str) -> String {
    format!("{} requires a payload", command)
}

/// Sender is not a participant of the target room
pub fn err_not_in_room(room_id: &str) -> String {
    format!("not a participant of room {}", room_id)
}

/// Frame could not be understood
pub fn err_invalid_message(reason: &str) -> String {
    format!("invalid message: {}", reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_problem() {
        assert!(err_room_required().contains("roomId"));
        assert!(err_invalid_room(&RoomIdError::TooLong).contains("exceeds"));
        assert_eq!(err_payload_required("offer"), "offer requires a payload");
        assert!(err_not_in_room("abc123").contains("abc123"));
        assert!(err_invalid_message("bad json").ends_with("bad json"));
    }
}
