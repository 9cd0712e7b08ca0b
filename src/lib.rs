//! # roomcast
//!
//! `roomcast` delivers chat messages to everyone currently connected to a
//! room. Messages are saved elsewhere. Once a message is durable, the
//! persistence path hands it to `HubManager::dispatch`, and every live
//! subscriber of the room receives it over its WebSocket.
//!
//! ## Core Modules
//!
//! - `hub`: one broadcast actor per active room and the registry that creates
//!   and retires them.
//! - `client`: the subscriber record, its lifecycle and the inbound/outbound
//!   pumps that drive a connection.
//! - `transport`: the `/ws/rooms/{id}` WebSocket endpoint.
//! - `config`: server and hub settings from file and environment.
//! - `utils`: error type and logging setup.

pub mod client;
pub mod config;
pub mod hub;
pub mod transport;
pub mod utils;

pub use hub::{HubHandle, HubManager, Message};
