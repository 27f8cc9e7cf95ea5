//! WebSocket session lifecycle: one peer from upgrade through disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use futures::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, info, instrument};

use super::connection::{OutboundText, PeerConnection};
use super::hub::Hub;
use super::router::route_message;

/// How long a closing writer waits for the peer to take the close frame.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Run a session for an upgraded socket whose connection the hub already
/// admitted.
///
/// Frames queued by the hub are written by a forwarder task; the reader loop
/// routes inbound text, records pongs and exits on close, on socket error or
/// when the hub closes the connection. Either way the hub's disconnect
/// handling runs exactly once.
#[instrument(skip_all, fields(conn_id = %connection.id))]
pub async fn run_ws_session(
    ws: WebSocket,
    hub: Arc<Hub>,
    connection: Arc<PeerConnection>,
    send_rx: mpsc::Receiver<OutboundText>,
) {
    let (ws_tx, mut ws_rx) = ws.split();
    let closed = connection.close_token();
    let outbound = tokio::spawn(write_outbound(ws_tx, send_rx, connection.clone()));

    loop {
        let frame = tokio::select! {
            frame = ws_rx.next() => frame,
            () = closed.cancelled() => {
                debug!("connection closed by hub");
                break;
            }
        };
        let Some(Ok(message)) = frame else {
            break;
        };
        match message {
            Message::Text(text) => {
                let _ = route_message(&hub, &connection, text.as_str());
            }
            Message::Binary(data) => match std::str::from_utf8(&data) {
                Ok(text) => {
                    let _ = route_message(&hub, &connection, text);
                }
                Err(_) => debug!(len = data.len(), "dropping non-UTF8 binary frame"),
            },
            Message::Pong(_) => connection.mark_alive(),
            // axum answers pings itself.
            Message::Ping(_) => {}
            Message::Close(_) => {
                debug!("peer sent close frame");
                break;
            }
        }
    }

    let _ = hub.disconnect(&connection.id);
    connection.close();
    let _ = outbound.await;
    info!(
        role = connection.role().label(),
        duration_secs = connection.age().as_secs(),
        dropped = connection.drop_count(),
        "session ended"
    );
}

/// Drain queued text and ping requests into `sink` until the connection
/// closes.
///
/// Every write races the close token, so a peer that stopped reading cannot
/// hold the writer past a forced close. The close frame itself gets
/// [`CLOSE_TIMEOUT`] before the sink is dropped.
async fn write_outbound<S>(
    mut sink: S,
    mut send_rx: mpsc::Receiver<OutboundText>,
    connection: Arc<PeerConnection>,
) where
    S: Sink<Message> + Unpin,
{
    let closed = connection.close_token();
    loop {
        let message = tokio::select! {
            biased;
            () = closed.cancelled() => break,
            text = send_rx.recv() => match text {
                Some(text) => Message::Text(text.as_str().into()),
                None => break,
            },
            () = connection.ping_requested() => Message::Ping(Bytes::new()),
        };
        let sent = tokio::select! {
            biased;
            () = closed.cancelled() => false,
            result = sink.send(message) => result.is_ok(),
        };
        if !sent {
            break;
        }
    }

    if closed.is_cancelled() {
        let close = Message::Close(Some(CloseFrame {
            code: close_code::AWAY,
            reason: Utf8Bytes::from_static(""),
        }));
        if time::timeout(CLOSE_TIMEOUT, sink.send(close)).await.is_err() {
            debug!(conn_id = %connection.id, "peer not accepting close frame, dropping socket");
        }
    } else {
        let _ = time::timeout(CLOSE_TIMEOUT, sink.close()).await;
    }
}
