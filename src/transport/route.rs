//! Request parsing for the WebSocket endpoint.
//!
//! Authentication happens upstream. The endpoint only reads the identity
//! the authenticating proxy forwards in `X-User-Id` / `X-Username`.

use tungstenite::http::{HeaderMap, StatusCode};

use crate::client::Identity;
use crate::hub::{RoomId, UserId};

pub const ROOM_PATH_PREFIX: &str = "/ws/rooms/";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USERNAME_HEADER: &str = "x-username";

/// Room and caller extracted from an upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub room_id: RoomId,
    pub identity: Identity,
}

/// Why an upgrade request was turned away, with the HTTP status to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotFound,
    InvalidRoomId,
    Unauthenticated,
}

impl Rejection {
    pub fn status(self) -> StatusCode {
        match self {
            Rejection::NotFound => StatusCode::NOT_FOUND,
            Rejection::InvalidRoomId => StatusCode::BAD_REQUEST,
            Rejection::Unauthenticated => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Rejection::NotFound => "Not found",
            Rejection::InvalidRoomId => "Invalid room ID",
            Rejection::Unauthenticated => "Missing authenticated user",
        }
    }
}

/// Parses `/ws/rooms/{id}`.
pub fn parse_room_path(path: &str) -> Result<RoomId, Rejection> {
    let raw = path
        .strip_prefix(ROOM_PATH_PREFIX)
        .ok_or(Rejection::NotFound)?;
    let raw = raw.strip_suffix('/').unwrap_or(raw);
    raw.parse().map_err(|_| Rejection::InvalidRoomId)
}

pub fn identity_from_headers(headers: &HeaderMap) -> Result<Identity, Rejection> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let user_id: UserId = header(USER_ID_HEADER)
        .and_then(|v| v.trim().parse().ok())
        .ok_or(Rejection::Unauthenticated)?;
    let username = header(USERNAME_HEADER).unwrap_or_default().to_string();

    Ok(Identity { user_id, username })
}

pub fn route(path: &str, headers: &HeaderMap) -> Result<Route, Rejection> {
    let room_id = parse_room_path(path)?;
    let identity = identity_from_headers(headers)?;
    Ok(Route { room_id, identity })
}
