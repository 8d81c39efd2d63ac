//! Input validation functions
//!
//! Reusable validators shared between relay and peers - peers use them to
//! pre-validate what they were given, the relay uses them for enforcement.

mod room_id;

pub use room_id::{
    GENERATED_ROOM_ID_LENGTH, MAX_ROOM_ID_LENGTH, RoomIdError, generate_room_id, validate_room_id,
};
