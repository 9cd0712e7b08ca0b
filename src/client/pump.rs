//! The two pumps that drive one subscriber connection.
//!
//! `read_pump` exists for liveness only: the live channel is receive-only, so
//! application frames from the peer are read and discarded. It watches for
//! pongs, close frames, oversize frames and transport errors.
//!
//! `write_pump` owns the sink. It drains the outbound queue and sends a ping
//! every `ping_period`. Every write is bounded by `write_wait`.
//!
//! Either pump may decide the connection is over; both then run the shared
//! `Teardown`, which unregisters from the hub once. The write pump dropping
//! its `done` sender is what tells the read pump to stop. In the other
//! direction, the write pump watches the teardown and stops writing as soon
//! as it has started, leaving any queued frames unsent.

use std::fmt::Display;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout, timeout_at};
use tungstenite::Error as WsError;
use tungstenite::protocol::Message as WsMessage;

use crate::client::Teardown;
use crate::config::HubSettings;

/// Why a pump stopped.
#[derive(Debug, Error)]
pub enum Disconnect {
    #[error("peer closed the connection")]
    PeerClosed,

    #[error("no pong received within {0:?}")]
    PongTimeout(Duration),

    #[error("frame of {size} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("transport error: {0}")]
    Transport(#[from] WsError),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    #[error("outbound queue closed by hub")]
    QueueClosed,

    #[error("outbound pump stopped")]
    WriterGone,

    #[error("connection is draining")]
    Draining,
}

/// Reads from the peer until the connection should end.
pub async fn read_pump<R>(
    mut stream: R,
    settings: &HubSettings,
    teardown: Teardown,
    mut writer_done: oneshot::Receiver<()>,
) -> Disconnect
where
    R: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    let pong_wait = settings.pong_wait();
    let limit = settings.max_message_size;
    let mut deadline = Instant::now() + pong_wait;

    let reason = loop {
        let next = tokio::select! {
            next = timeout_at(deadline, stream.next()) => next,
            _ = &mut writer_done => break Disconnect::WriterGone,
        };

        let frame = match next {
            Err(_) => break Disconnect::PongTimeout(pong_wait),
            Ok(None) => break Disconnect::PeerClosed,
            Ok(Some(Err(e))) => break Disconnect::Transport(e),
            Ok(Some(Ok(frame))) => frame,
        };

        if frame.len() > limit {
            break Disconnect::FrameTooLarge {
                size: frame.len(),
                limit,
            };
        }

        match frame {
            WsMessage::Pong(_) => deadline = Instant::now() + pong_wait,
            WsMessage::Close(_) => break Disconnect::PeerClosed,
            _ => {}
        }
    };

    teardown.run(&reason);
    reason
}

/// Writes queued frames and keepalive pings to the peer.
///
/// Ends when the hub closes the queue (after sending a close frame), when the
/// read side has started the teardown, or on the first failed or timed-out
/// write. The sink is closed on the way out.
pub async fn write_pump<W>(
    mut sink: W,
    mut outbox: mpsc::Receiver<WsMessage>,
    settings: &HubSettings,
    teardown: Teardown,
    _done: oneshot::Sender<()>,
) -> Disconnect
where
    W: Sink<WsMessage> + Unpin,
    W::Error: Display,
{
    let write_wait = settings.write_wait();
    let period = settings.ping_period();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let reason = loop {
        tokio::select! {
            biased;

            _ = teardown.started() => break Disconnect::Draining,
            next = outbox.recv() => match next {
                Some(frame) => {
                    if let Err(reason) = write_frame(&mut sink, frame, write_wait).await {
                        break reason;
                    }
                }
                None => {
                    let _ = write_frame(&mut sink, WsMessage::Close(None), write_wait).await;
                    break Disconnect::QueueClosed;
                }
            },
            _ = ticker.tick() => {
                let ping = WsMessage::Ping(Default::default());
                if let Err(reason) = write_frame(&mut sink, ping, write_wait).await {
                    break reason;
                }
            }
        }
    };

    teardown.run(&reason);
    let _ = timeout(write_wait, sink.close()).await;
    reason
}

async fn write_frame<W>(sink: &mut W, frame: WsMessage, write_wait: Duration) -> Result<(), Disconnect>
where
    W: Sink<WsMessage> + Unpin,
    W::Error: Display,
{
    match timeout(write_wait, sink.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(Disconnect::WriteFailed(e.to_string())),
        Err(_) => Err(Disconnect::WriteTimeout(write_wait)),
    }
}
