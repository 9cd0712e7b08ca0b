//! Chat message relayed to room subscribers.
//!
//! The hub never creates or stores messages. The persistence path saves a
//! message first, then hands the saved value to `HubManager::dispatch`.
//! Messages reach clients as JSON text frames:
//!
//! ```json
//! {"id":1,"room_id":42,"user_id":7,"username":"ada","content":"hi","created_at":"2026-01-01T00:00:00Z"}
//! ```
//!
//! `username` is omitted when empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type RoomId = i64;
pub type UserId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub room_id: RoomId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
