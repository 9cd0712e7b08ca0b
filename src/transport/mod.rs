//! The `transport` module is the connection endpoint in front of the hubs.
//!
//! It parses the room and forwarded identity from the upgrade request,
//! performs the WebSocket handshake and hands the connection to the
//! broadcast core. Nothing is read from clients beyond control frames.

pub mod route;
pub mod websocket;

pub use websocket::{serve, start_websocket_server};

#[cfg(test)]
mod tests;
#[cfg(test)]
mod websocket_tests;
