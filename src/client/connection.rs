//! Runs one subscriber connection from registration to close.

use std::fmt::Display;
use std::sync::Arc;

use futures_util::{Sink, Stream, StreamExt};
use tokio::sync::oneshot;
use tracing::{debug, warn};
use tungstenite::Error as WsError;
use tungstenite::protocol::Message as WsMessage;

use crate::client::{Client, Disconnect, Identity, Lifecycle, Teardown, read_pump, write_pump};
use crate::config::HubSettings;
use crate::hub::{HubManager, RoomId};

/// A single-use subscriber session: one identity, one room, one connection.
#[derive(Debug)]
pub struct Connection {
    identity: Identity,
    room_id: RoomId,
    lifecycle: Arc<Lifecycle>,
}

impl Connection {
    pub fn new(identity: Identity, room_id: RoomId) -> Self {
        Self {
            identity,
            room_id,
            lifecycle: Arc::new(Lifecycle::default()),
        }
    }

    /// Shared view of this connection's state, usable after `serve` has
    /// consumed the connection.
    pub fn lifecycle(&self) -> Arc<Lifecycle> {
        self.lifecycle.clone()
    }

    /// Joins the room and pumps `ws` until either side ends the connection.
    ///
    /// Returns the reason the inbound pump stopped.
    pub async fn serve<S>(self, ws: S, manager: &HubManager, settings: &HubSettings) -> Disconnect
    where
        S: Stream<Item = Result<WsMessage, WsError>> + Sink<WsMessage> + Send + 'static,
        <S as Sink<WsMessage>>::Error: Display + Send,
    {
        let hub = manager.get_or_create(self.room_id);
        let (client, outbox) = Client::new(
            self.identity.user_id,
            self.room_id,
            settings.send_queue_capacity,
        );
        let client_id = client.id;
        hub.register(client);
        self.lifecycle.mark_registered();
        debug!(
            room_id = self.room_id,
            client_id = %client_id,
            user_id = self.identity.user_id,
            username = %self.identity.username,
            "client connected"
        );

        let teardown = Teardown::new(hub, client_id, self.lifecycle.clone());
        let (sink, stream) = ws.split::<WsMessage>();
        let (done_tx, done_rx) = oneshot::channel();

        let writer = {
            let settings = settings.clone();
            let teardown = teardown.clone();
            tokio::spawn(async move { write_pump(sink, outbox, &settings, teardown, done_tx).await })
        };

        let reason = read_pump(stream, settings, teardown, done_rx).await;

        match writer.await {
            Ok(write_reason) => debug!(client_id = %client_id, %write_reason, "outbound pump stopped"),
            Err(e) => warn!(client_id = %client_id, "outbound pump failed: {e}"),
        }
        self.lifecycle.mark_closed();
        reason
    }
}
