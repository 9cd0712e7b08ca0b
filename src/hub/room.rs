//! Per-room broadcast actor.
//!
//! A `Hub` owns the subscriber set of exactly one room. Every mutation and
//! every broadcast arrives as a `HubCommand` on one unbounded inbox and is
//! applied by a single task, so the set needs no lock. Callers only ever see
//! a `HubHandle`, whose methods enqueue and return immediately.
//!
//! Fan-out never waits on a subscriber: each member gets a `try_send`, and a
//! member whose queue is full (or already closed) is dropped from the set on
//! the spot. Dropping the member drops the only sender of its queue, which is
//! how its outbound pump learns that it has been disconnected.
//!
//! When the set becomes empty the hub asks the registry to forget it through
//! the injected `Release` capability, and the task ends once the last handle
//! is gone.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::client::{Client, ClientId};
use crate::hub::manager::Release;
use crate::hub::message::{Message, RoomId, UserId};

/// Process-unique identity of one hub instance. A room that empties and is
/// later reopened gets a hub with a new id.
pub type HubId = u64;

static NEXT_HUB_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub(crate) enum HubCommand {
    Register(Client),
    Unregister(ClientId),
    Broadcast(Message),
    MemberCount { respond_to: oneshot::Sender<usize> },
}

/// Cheap-to-clone handle to a running hub.
#[derive(Clone)]
pub struct HubHandle {
    id: HubId,
    room_id: RoomId,
    sender: mpsc::UnboundedSender<HubCommand>,
}

impl HubHandle {
    pub fn id(&self) -> HubId {
        self.id
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Adds `client` to the room. Always accepted once the hub processes it.
    pub fn register(&self, client: Client) {
        self.send(HubCommand::Register(client));
    }

    /// Removes a client and closes its outbound queue. Unknown ids are ignored,
    /// so both pumps of a connection may call this.
    pub fn unregister(&self, client_id: ClientId) {
        self.send(HubCommand::Unregister(client_id));
    }

    /// Queues `message` for every current member of the room.
    pub fn broadcast(&self, message: Message) {
        self.send(HubCommand::Broadcast(message));
    }

    /// Number of members once every command sent before this call has been
    /// applied. Returns 0 if the hub task is gone.
    pub async fn member_count(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::MemberCount { respond_to: tx });
        rx.await.unwrap_or(0)
    }

    fn send(&self, cmd: HubCommand) {
        // The task only stops after every handle is dropped, so this cannot
        // fail while `self` is alive.
        if self.sender.send(cmd).is_err() {
            debug!(room_id = self.room_id, hub_id = self.id, "hub task already stopped");
        }
    }
}

impl PartialEq for HubHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for HubHandle {}

impl fmt::Debug for HubHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubHandle")
            .field("id", &self.id)
            .field("room_id", &self.room_id)
            .finish()
    }
}

#[derive(Debug)]
struct Member {
    user_id: UserId,
    sender: mpsc::Sender<WsMessage>,
}

pub(crate) struct Hub {
    id: HubId,
    room_id: RoomId,
    members: HashMap<ClientId, Member>,
    inbox: mpsc::UnboundedReceiver<HubCommand>,
    /// Lets a released hub put itself back into the registry without keeping
    /// its own inbox open.
    weak_sender: mpsc::WeakUnboundedSender<HubCommand>,
    release: Release,
    /// Set once the hub has asked the registry to drop it.
    retired: bool,
}

impl Hub {
    pub(crate) fn new(room_id: RoomId, release: Release) -> (HubHandle, Hub) {
        let (sender, inbox) = mpsc::unbounded_channel();
        let id = NEXT_HUB_ID.fetch_add(1, Ordering::Relaxed);
        let hub = Hub {
            id,
            room_id,
            members: HashMap::new(),
            inbox,
            weak_sender: sender.downgrade(),
            release,
            retired: false,
        };
        let handle = HubHandle {
            id,
            room_id,
            sender,
        };
        (handle, hub)
    }

    /// Processes commands until every handle has been dropped.
    pub(crate) async fn run(mut self) {
        debug!(room_id = self.room_id, hub_id = self.id, "hub started");

        while let Some(cmd) = self.inbox.recv().await {
            self.handle_command(cmd);
        }

        debug!(room_id = self.room_id, hub_id = self.id, "hub stopped");
    }

    fn handle_command(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Register(client) => self.register(client),
            HubCommand::Unregister(client_id) => self.unregister(client_id),
            HubCommand::Broadcast(message) => self.broadcast(&message),
            HubCommand::MemberCount { respond_to } => {
                let _ = respond_to.send(self.members.len());
            }
        }
    }

    fn register(&mut self, client: Client) {
        if self.retired && !self.reinstate() {
            // Another hub owns the room now. Dropping the client closes its
            // queue, so the connection ends instead of idling here unseen.
            warn!(
                room_id = self.room_id,
                hub_id = self.id,
                client_id = %client.id,
                "register reached a released hub, closing client"
            );
            return;
        }

        let Client {
            id,
            user_id,
            sender,
            ..
        } = client;
        self.members.insert(id, Member { user_id, sender });
        debug!(
            room_id = self.room_id,
            client_id = %id,
            user_id,
            members = self.members.len(),
            "client registered"
        );
    }

    fn unregister(&mut self, client_id: ClientId) {
        if let Some(member) = self.members.remove(&client_id) {
            debug!(
                room_id = self.room_id,
                client_id = %client_id,
                user_id = member.user_id,
                members = self.members.len(),
                "client unregistered"
            );
            self.release_if_empty();
        }
    }

    fn broadcast(&mut self, message: &Message) {
        let text = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                warn!(room_id = self.room_id, "failed to serialize message: {e}");
                return;
            }
        };
        let frame = WsMessage::text(text);
        let room_id = self.room_id;

        let before = self.members.len();
        self.members
            .retain(|client_id, member| match member.sender.try_send(frame.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        room_id,
                        client_id = %client_id,
                        user_id = member.user_id,
                        "outbound queue full, evicting subscriber"
                    );
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(room_id, client_id = %client_id, "outbound queue closed, dropping subscriber");
                    false
                }
            });

        if self.members.len() < before {
            self.release_if_empty();
        }
    }

    fn release_if_empty(&mut self) {
        if !self.members.is_empty() || self.retired {
            return;
        }
        self.retired = true;
        if self.release.release(self.room_id, self.id) {
            info!(room_id = self.room_id, hub_id = self.id, "hub removed");
        }
    }

    fn reinstate(&mut self) -> bool {
        let Some(sender) = self.weak_sender.upgrade() else {
            return false;
        };
        let handle = HubHandle {
            id: self.id,
            room_id: self.room_id,
            sender,
        };
        if self.release.reinstate(handle) {
            self.retired = false;
            info!(room_id = self.room_id, hub_id = self.id, "hub reinstated");
            true
        } else {
            false
        }
    }
}
