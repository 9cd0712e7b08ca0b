//! The `client` module covers everything on the subscriber side of a room:
//! the `Client` record a hub keeps, the per-connection lifecycle and the
//! inbound and outbound pumps that move frames between a hub and a socket.

pub mod connection;
pub mod lifecycle;
pub mod pump;
pub mod subscriber;

pub use connection::Connection;
pub use lifecycle::{ClientState, Lifecycle, Teardown};
pub use pump::{Disconnect, read_pump, write_pump};
pub use subscriber::{Client, ClientId, Identity};
