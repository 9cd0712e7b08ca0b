use super::route::{Rejection, identity_from_headers, parse_room_path, route};
use tungstenite::http::{HeaderMap, HeaderValue, StatusCode};

fn headers(user_id: Option<&'static str>, username: Option<&'static str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(id) = user_id {
        headers.insert("x-user-id", HeaderValue::from_static(id));
    }
    if let Some(name) = username {
        headers.insert("x-username", HeaderValue::from_static(name));
    }
    headers
}

#[test]
fn test_parse_room_path() {
    assert_eq!(parse_room_path("/ws/rooms/42"), Ok(42));
    assert_eq!(parse_room_path("/ws/rooms/42/"), Ok(42));
    assert_eq!(parse_room_path("/ws/rooms/-3"), Ok(-3));
    assert_eq!(parse_room_path("/ws/rooms/abc"), Err(Rejection::InvalidRoomId));
    assert_eq!(parse_room_path("/ws/rooms/"), Err(Rejection::InvalidRoomId));
    assert_eq!(parse_room_path("/rooms/42"), Err(Rejection::NotFound));
}

#[test]
fn test_identity_from_headers() {
    let identity = identity_from_headers(&headers(Some("7"), Some("ada"))).unwrap();
    assert_eq!(identity.user_id, 7);
    assert_eq!(identity.username, "ada");

    let anonymous_name = identity_from_headers(&headers(Some("8"), None)).unwrap();
    assert_eq!(anonymous_name.username, "");

    assert_eq!(
        identity_from_headers(&headers(None, Some("ada"))),
        Err(Rejection::Unauthenticated)
    );
    assert_eq!(
        identity_from_headers(&headers(Some("seven"), None)),
        Err(Rejection::Unauthenticated)
    );
}

#[test]
fn test_route_checks_path_before_identity() {
    let err = route("/ws/rooms/x", &HeaderMap::new()).unwrap_err();
    assert_eq!(err, Rejection::InvalidRoomId);
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let ok = route("/ws/rooms/5", &headers(Some("1"), Some("bob"))).unwrap();
    assert_eq!(ok.room_id, 5);
    assert_eq!(ok.identity.user_id, 1);
}

#[test]
fn test_rejection_statuses() {
    assert_eq!(Rejection::NotFound.status(), StatusCode::NOT_FOUND);
    assert_eq!(Rejection::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(Rejection::InvalidRoomId.message(), "Invalid room ID");
}
