//! Connection state shared by the two pumps of one client.
//!
//! ```text
//! Connecting -> Registered -> Draining -> Closed
//! ```
//!
//! Whichever pump stops first moves the client into `Draining` and runs the
//! teardown; the other pump finds the transition already taken. Entering
//! `Draining` also wakes the outbound pump so it stops writing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::Notify;
use tracing::debug;

use crate::client::{ClientId, Disconnect};
use crate::hub::HubHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClientState {
    Connecting = 0,
    Registered = 1,
    Draining = 2,
    Closed = 3,
}

impl ClientState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ClientState::Connecting,
            1 => ClientState::Registered,
            2 => ClientState::Draining,
            _ => ClientState::Closed,
        }
    }
}

#[derive(Debug)]
pub struct Lifecycle {
    state: AtomicU8,
    drained: Notify,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(ClientState::Connecting as u8),
            drained: Notify::new(),
        }
    }
}

impl Lifecycle {
    pub fn state(&self) -> ClientState {
        ClientState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// `Connecting -> Registered`. Returns false from any other state.
    pub fn mark_registered(&self) -> bool {
        self.transition(|s| (s == ClientState::Connecting).then_some(ClientState::Registered))
    }

    /// Enters `Draining`. Only the first caller gets `true`.
    pub fn begin_draining(&self) -> bool {
        let first = self.transition(|s| match s {
            ClientState::Connecting | ClientState::Registered => Some(ClientState::Draining),
            ClientState::Draining | ClientState::Closed => None,
        });
        if first {
            self.drained.notify_waiters();
        }
        first
    }

    pub fn is_draining(&self) -> bool {
        matches!(self.state(), ClientState::Draining | ClientState::Closed)
    }

    /// Resolves once the client has entered `Draining` (or is already past it).
    pub async fn draining(&self) {
        let notified = self.drained.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_draining() {
            return;
        }
        notified.await;
    }

    /// Terminal. Reached once both pumps have exited.
    pub fn mark_closed(&self) {
        self.state.store(ClientState::Closed as u8, Ordering::Release);
    }

    fn transition<F>(&self, f: F) -> bool
    where
        F: Fn(ClientState) -> Option<ClientState>,
    {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                f(ClientState::from_u8(raw)).map(|next| next as u8)
            })
            .is_ok()
    }
}

/// The single teardown sequence of a client, shared by both pumps.
#[derive(Debug, Clone)]
pub struct Teardown {
    hub: HubHandle,
    client_id: ClientId,
    lifecycle: Arc<Lifecycle>,
}

impl Teardown {
    pub fn new(hub: HubHandle, client_id: ClientId, lifecycle: Arc<Lifecycle>) -> Self {
        Self {
            hub,
            client_id,
            lifecycle,
        }
    }

    /// Unregisters the client from its hub. Returns `false` if teardown had
    /// already started.
    pub fn run(&self, reason: &Disconnect) -> bool {
        if !self.lifecycle.begin_draining() {
            return false;
        }
        debug!(
            room_id = self.hub.room_id(),
            client_id = %self.client_id,
            %reason,
            "tearing down client"
        );
        self.hub.unregister(self.client_id);
        true
    }

    /// Resolves once either pump has started the teardown.
    pub async fn started(&self) {
        self.lifecycle.draining().await
    }
}
