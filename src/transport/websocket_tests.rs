use crate::config::HubSettings;
use crate::hub::{HubManager, Message, RoomId};
use crate::transport::websocket::{accept_with_retry, serve};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tungstenite::Error as WsError;
use tungstenite::client::IntoClientRequest;
use tungstenite::http::{HeaderValue, StatusCode};
use tungstenite::protocol::Message as WsMessage;

type ClientWs = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn setup_server() -> (SocketAddr, HubManager) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("local addr");
    let manager = HubManager::new();

    tokio::spawn(serve(listener, manager.clone(), HubSettings::default()));
    (addr, manager)
}

async fn connect(addr: SocketAddr, path: &str, user_id: Option<&'static str>) -> Result<ClientWs, WsError> {
    let mut request = format!("ws://{addr}{path}")
        .into_client_request()
        .expect("valid request");
    if let Some(id) = user_id {
        request
            .headers_mut()
            .insert("x-user-id", HeaderValue::from_static(id));
        request
            .headers_mut()
            .insert("x-username", HeaderValue::from_static("tester"));
    }
    connect_async(request).await.map(|(ws, _)| ws)
}

/// Waits until the hub for `room_id` reports `members` subscribers.
async fn wait_for_members(manager: &HubManager, room_id: RoomId, members: usize) {
    for _ in 0..200 {
        let current = match manager.lookup(room_id) {
            Some(hub) => hub.member_count().await,
            None => 0,
        };
        if current == members {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("room {room_id} never reached {members} members");
}

fn message(room_id: RoomId, content: &str) -> Message {
    Message {
        id: 1,
        room_id,
        user_id: 3,
        username: "sender".to_string(),
        content: content.to_string(),
        created_at: Utc::now(),
    }
}

async fn next_message(ws: &mut ClientWs) -> Message {
    let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("Did not receive message in time")
        .expect("stream ended")
        .expect("read failed");
    serde_json::from_str(frame.to_text().unwrap()).unwrap_or_else(|e| {
        panic!("Failed to deserialize Message from '{frame:?}': {e}");
    })
}

#[tokio::test]
async fn test_subscribers_receive_dispatched_messages() {
    let (addr, manager) = setup_server().await;

    let mut a = connect(addr, "/ws/rooms/42", Some("1")).await.expect("A connect");
    let mut b = connect(addr, "/ws/rooms/42", Some("2")).await.expect("B connect");
    let mut other = connect(addr, "/ws/rooms/43", Some("3")).await.expect("other connect");
    wait_for_members(&manager, 42, 2).await;
    wait_for_members(&manager, 43, 1).await;

    assert!(manager.dispatch(message(42, "hello room")));

    assert_eq!(next_message(&mut a).await.content, "hello room");
    assert_eq!(next_message(&mut b).await.content, "hello room");

    // room 43 got nothing
    let quiet = tokio::time::timeout(Duration::from_millis(100), other.next()).await;
    assert!(quiet.is_err());
}

#[tokio::test]
async fn test_room_is_removed_after_last_client_leaves() {
    let (addr, manager) = setup_server().await;

    let mut ws = connect(addr, "/ws/rooms/7", Some("4")).await.expect("connect");
    wait_for_members(&manager, 7, 1).await;

    ws.close(None).await.expect("Failed to close WebSocket");
    wait_for_members(&manager, 7, 0).await;
    for _ in 0..200 {
        if manager.lookup(7).is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(manager.lookup(7).is_none());
    assert!(!manager.dispatch(message(7, "too late")));
}

#[tokio::test]
async fn test_peer_frames_do_not_reach_room() {
    let (addr, manager) = setup_server().await;

    let mut sender = connect(addr, "/ws/rooms/9", Some("5")).await.expect("connect");
    let mut listener = connect(addr, "/ws/rooms/9", Some("6")).await.expect("connect");
    wait_for_members(&manager, 9, 2).await;

    sender
        .send(WsMessage::text("not a publish path"))
        .await
        .expect("send");

    let quiet = tokio::time::timeout(Duration::from_millis(100), listener.next()).await;
    assert!(quiet.is_err());
    wait_for_members(&manager, 9, 2).await;
}

#[tokio::test]
async fn test_invalid_room_id_is_rejected() {
    let (addr, manager) = setup_server().await;

    match connect(addr, "/ws/rooms/not-a-number", Some("1")).await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), StatusCode::BAD_REQUEST),
        other => panic!("Expected HTTP 400, got {:?}", other.map(|_| ())),
    }
    assert_eq!(manager.room_count(), 0);
}

#[tokio::test]
async fn test_missing_identity_is_rejected() {
    let (addr, manager) = setup_server().await;

    match connect(addr, "/ws/rooms/1", None).await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), StatusCode::UNAUTHORIZED),
        other => panic!("Expected HTTP 401, got {:?}", other.map(|_| ())),
    }
    assert_eq!(manager.room_count(), 0);
}

#[tokio::test]
async fn test_oversize_frame_disconnects_client() {
    let (addr, manager) = setup_server().await;

    let mut ws = connect(addr, "/ws/rooms/12", Some("1")).await.expect("connect");
    wait_for_members(&manager, 12, 1).await;

    let limit = HubSettings::default().max_message_size;
    let _ = ws.send(WsMessage::text("x".repeat(limit * 4))).await;

    wait_for_members(&manager, 12, 0).await;
}

#[tokio::test(start_paused = true)]
async fn test_accept_errors_are_retried() {
    let mut attempts = 0;
    let accepted = accept_with_retry(|| {
        attempts += 1;
        let result = match attempts {
            1 => Err(io::Error::from_raw_os_error(24)),
            2 => Err(io::Error::from(io::ErrorKind::ConnectionAborted)),
            _ => Ok("conn"),
        };
        async move { result }
    })
    .await;

    assert_eq!(accepted, "conn");
    assert_eq!(attempts, 3);
}

#[tokio::test]
async fn test_server_keeps_serving_after_client_aborts() {
    let (addr, manager) = setup_server().await;

    // a peer that connects and vanishes without a handshake
    drop(tokio::net::TcpStream::connect(addr).await.unwrap());

    let mut ws = connect(addr, "/ws/rooms/61", Some("3")).await.unwrap();
    wait_for_members(&manager, 61, 1).await;
    ws.close(None).await.unwrap();
    wait_for_members(&manager, 61, 0).await;
}
