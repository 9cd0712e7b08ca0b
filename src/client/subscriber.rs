//! Subscriber representation
//!
//! `Client` is the membership record a hub keeps for one connection: who it
//! is and the sending half of its bounded outbound queue. The receiving half
//! stays with the connection's outbound pump. The hub holds the only sender,
//! so removing the record from the hub closes the queue exactly once.

use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::hub::{RoomId, UserId};

pub type ClientId = Uuid;

#[derive(Debug)]
pub struct Client {
    pub id: ClientId,
    pub user_id: UserId,
    pub room_id: RoomId,
    pub sender: mpsc::Sender<WsMessage>,
}

impl Client {
    /// Creates a client with an outbound queue of `capacity` frames and
    /// returns the queue's receiving end alongside it.
    pub fn new(
        user_id: UserId,
        room_id: RoomId,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<WsMessage>) {
        let (sender, outbox) = mpsc::channel(capacity.max(1));
        let client = Self {
            id: Uuid::new_v4(),
            user_id,
            room_id,
            sender,
        };
        (client, outbox)
    }
}

/// Authenticated caller, as established by the authentication layer in
/// front of the endpoint. The hub trusts it as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
}
