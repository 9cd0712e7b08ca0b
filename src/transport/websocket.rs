//! WebSocket transport
//!
//! Accepts TCP connections, performs the upgrade on `/ws/rooms/{id}` and
//! hands each connection to the broadcast core as a new subscriber.
//! Responsibilities:
//! - Reject upgrades with a bad path (404), a non-numeric room id (400) or
//!   no forwarded identity (401)
//! - Apply the frame size limit to the protocol itself
//! - Run the connection's pumps until it closes

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async_with_config;
use tracing::{debug, info, warn};
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::protocol::WebSocketConfig;

use crate::client::Connection;
use crate::config::HubSettings;
use crate::hub::HubManager;
use crate::transport::route::{Rejection, Route, route};
use crate::utils::error::{Error, Result};

/// Binds `addr` and serves connections until the listener fails.
pub async fn start_websocket_server(
    addr: &str,
    manager: HubManager,
    settings: HubSettings,
) -> Result<()> {
    let listener = TcpListener::bind(addr).await.map_err(|source| Error::Bind {
        addr: addr.to_string(),
        source,
    })?;

    info!("WebSocket server listening on ws://{addr}");
    serve(listener, manager, settings).await;
    Ok(())
}

/// Pause after a failed `accept` before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Serves connections from an already bound listener. Runs until cancelled.
pub async fn serve(listener: TcpListener, manager: HubManager, settings: HubSettings) {
    let listener = &listener;
    loop {
        let (stream, peer) = accept_with_retry(move || listener.accept()).await;
        let manager = manager.clone();
        let settings = settings.clone();

        tokio::spawn(async move {
            handle_connection(stream, peer, manager, settings).await;
        });
    }
}

/// Keeps calling `accept` until it yields a connection. Failures such as
/// `EMFILE` or an aborted handshake only affect one attempt.
pub(crate) async fn accept_with_retry<F, Fut, T>(mut accept: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    loop {
        match accept().await {
            Ok(accepted) => return accepted,
            Err(e) => {
                warn!("failed to accept connection: {e}");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

fn reject(rejection: Rejection) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(rejection.message().to_string()));
    *response.status_mut() = rejection.status();
    response
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    manager: HubManager,
    settings: HubSettings,
) {
    let mut routed: Option<Route> = None;
    let callback = |request: &Request, response: Response| {
        match route(request.uri().path(), request.headers()) {
            Ok(r) => {
                routed = Some(r);
                Ok(response)
            }
            Err(rejection) => {
                debug!(%peer, path = request.uri().path(), ?rejection, "rejecting upgrade");
                Err(reject(rejection))
            }
        }
    };

    let config = WebSocketConfig::default()
        .max_message_size(Some(settings.max_message_size))
        .max_frame_size(Some(settings.max_message_size));

    let ws_stream = match accept_hdr_async_with_config(stream, callback, Some(config)).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer, "WebSocket handshake error: {e}");
            return;
        }
    };

    let Some(Route { room_id, identity }) = routed else {
        return;
    };
    let user_id = identity.user_id;

    let reason = Connection::new(identity, room_id)
        .serve(ws_stream, &manager, &settings)
        .await;
    info!(%peer, room_id, user_id, %reason, "client disconnected");
}
