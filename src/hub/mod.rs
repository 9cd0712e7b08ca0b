//! The `hub` module is the broadcast core: one actor per active room and the
//! registry that creates and retires them.
//!
//! - `manager`: `HubManager`, the process-wide room → hub directory.
//! - `room`: the `Hub` actor and the `HubHandle` used to talk to it.
//! - `message`: the chat `Message` payload relayed to subscribers.

pub mod manager;
pub mod message;
pub mod room;

pub use manager::HubManager;
pub use message::{Message, RoomId, UserId};
pub use room::{HubHandle, HubId};
