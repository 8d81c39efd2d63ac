//! Room registry for pairing peers during negotiation

mod manager;
mod types;

pub use manager::RoomRegistry;
pub use types::{ForwardError, JoinResult, LeaveResult, Room, RoomInfo};
