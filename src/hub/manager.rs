//! Registry of live hubs, one per active room.
//!
//! The map is guarded by a `RwLock` that is held only for the lookup, insert
//! or delete itself. Hubs run on their own tasks and never execute under the
//! lock. `get_or_create` and `remove` take the write side, `lookup` the read
//! side, so two racing first subscribers of a room always end up with the
//! same hub.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tracing::{debug, info};

use crate::hub::message::{Message, RoomId};
use crate::hub::room::{Hub, HubHandle, HubId};

type Rooms = RwLock<HashMap<RoomId, HubHandle>>;

fn read(rooms: &Rooms) -> RwLockReadGuard<'_, HashMap<RoomId, HubHandle>> {
    rooms.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(rooms: &Rooms) -> RwLockWriteGuard<'_, HashMap<RoomId, HubHandle>> {
    rooms.write().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Default)]
pub struct HubManager {
    rooms: Arc<Rooms>,
}

impl HubManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the hub for `room_id`, starting one if the room has none.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn get_or_create(&self, room_id: RoomId) -> HubHandle {
        let (handle, hub) = {
            let mut rooms = write(&self.rooms);
            if let Some(handle) = rooms.get(&room_id) {
                return handle.clone();
            }
            let (handle, hub) = Hub::new(room_id, Release::new(&self.rooms));
            rooms.insert(room_id, handle.clone());
            (handle, hub)
        };

        info!(room_id, hub_id = handle.id(), "created hub for room");
        tokio::spawn(hub.run());
        handle
    }

    /// Returns the hub for `room_id` if the room currently has subscribers.
    pub fn lookup(&self, room_id: RoomId) -> Option<HubHandle> {
        read(&self.rooms).get(&room_id).cloned()
    }

    /// Forgets the hub for `room_id`. Removing an absent room is not an error.
    pub fn remove(&self, room_id: RoomId) -> bool {
        let removed = write(&self.rooms).remove(&room_id).is_some();
        if removed {
            info!(room_id, "hub removed");
        }
        removed
    }

    /// Fans a freshly saved message out to its room.
    ///
    /// Returns `false` without doing anything when nobody is subscribed to
    /// `message.room_id`.
    pub fn dispatch(&self, message: Message) -> bool {
        match self.lookup(message.room_id) {
            Some(hub) => {
                hub.broadcast(message);
                true
            }
            None => {
                debug!(room_id = message.room_id, "no live hub, skipping broadcast");
                false
            }
        }
    }

    pub fn room_count(&self) -> usize {
        read(&self.rooms).len()
    }
}

/// Capability handed to each hub so it can drop (or restore) its own
/// registry entry. Holds the map weakly; the registry owns its hubs, not the
/// other way around.
#[derive(Debug, Clone)]
pub(crate) struct Release {
    rooms: Weak<Rooms>,
}

impl Release {
    fn new(rooms: &Arc<Rooms>) -> Self {
        Self {
            rooms: Arc::downgrade(rooms),
        }
    }

    /// Removes the entry for `room_id` if it still belongs to hub `hub_id`.
    pub(crate) fn release(&self, room_id: RoomId, hub_id: HubId) -> bool {
        let Some(rooms) = self.rooms.upgrade() else {
            return false;
        };
        let mut rooms = write(&rooms);
        match rooms.entry(room_id) {
            Entry::Occupied(entry) if entry.get().id() == hub_id => {
                entry.remove();
                true
            }
            _ => false,
        }
    }

    /// Puts `handle` back as the room's hub unless a successor took the slot.
    pub(crate) fn reinstate(&self, handle: HubHandle) -> bool {
        let Some(rooms) = self.rooms.upgrade() else {
            return false;
        };
        let mut rooms = write(&rooms);
        match rooms.entry(handle.room_id()) {
            Entry::Vacant(entry) => {
                entry.insert(handle);
                true
            }
            Entry::Occupied(entry) => entry.get().id() == handle.id(),
        }
    }
}
