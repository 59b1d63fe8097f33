//! Relay endpoint: every data frame a client sends is fanned out to the
//! other open clients through the [`RelayHub`](crate::network::RelayHub).
//!
//! Each connection runs two halves:
//! - a read loop that broadcasts inbound text/binary frames
//! - a write loop that drains the connection's outbound channel into the socket

use std::sync::Arc;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, Instrument};

use super::RelayState;
use crate::network::{ConnectionHandle, OutboundMessage, RelayFrame};

/// Accepts a WebSocket upgrade on any path of the relay listener.
///
/// The connection is `Connecting` until the handshake completes, then joins
/// the Connection Set as `Open`.
pub async fn relay_upgrade_handler(
    State(state): State<RelayState>,
    ws: WebSocketUpgrade,
) -> Response {
    let (handle, rx) = state.hub.connect(&state.config.connection);
    let id = handle.id;
    ws.max_message_size(state.config.connection.max_message_size)
        .on_failed_upgrade(move |err| {
            debug!(connection = id.0, error = %err, "relay handshake failed");
        })
        .on_upgrade(move |socket| {
            let span = tracing::info_span!("relay", connection = id.0);
            run_connection(socket, state, handle, rx).instrument(span)
        })
}

/// What the read loop does with one inbound message.
#[derive(Debug, PartialEq, Eq)]
enum Inbound {
    Relay(RelayFrame),
    Control,
    Close,
}

fn classify(message: Message) -> Inbound {
    match message {
        Message::Text(text) => Inbound::Relay(RelayFrame::Text(text)),
        Message::Binary(bytes) => Inbound::Relay(RelayFrame::Binary(bytes)),
        Message::Ping(_) | Message::Pong(_) => Inbound::Control,
        Message::Close(_) => Inbound::Close,
    }
}

fn outbound_to_message(msg: OutboundMessage) -> Message {
    match msg {
        OutboundMessage::Frame(RelayFrame::Text(text)) => Message::Text(text),
        OutboundMessage::Frame(RelayFrame::Binary(bytes)) => Message::Binary(bytes),
        OutboundMessage::Close(reason) => Message::Close(Some(CloseFrame {
            code: close_code::AWAY,
            reason: reason.unwrap_or_default().into(),
        })),
    }
}

async fn run_connection(
    socket: WebSocket,
    state: RelayState,
    handle: Arc<ConnectionHandle>,
    rx: mpsc::Receiver<OutboundMessage>,
) {
    if !state.hub.open(&handle) {
        debug!("connection closed before handshake completed");
        return;
    }
    info!(peers = state.hub.len(), "relay connection opened");

    let (sink, mut stream) = socket.split();
    let writer = tokio::spawn(write_loop(sink, rx, Arc::clone(&handle)).in_current_span());

    let skip = (!state.config.echo_to_sender).then_some(handle.id);
    while let Some(result) = stream.next().await {
        let message = match result {
            Ok(message) => message,
            Err(err) => {
                debug!(error = %err, "relay read failed");
                break;
            }
        };
        match classify(message) {
            Inbound::Relay(frame) => {
                let report = state.hub.broadcast(&frame, skip);
                trace!(
                    bytes = frame.len(),
                    delivered = report.delivered,
                    "relayed frame"
                );
            }
            Inbound::Control => {}
            Inbound::Close => break,
        }
    }

    // Removal from the set is left to the next broadcast.
    handle.mark_closed();
    writer.abort();
    info!(
        open_secs = handle.connected_at.elapsed().as_secs(),
        "relay connection closed"
    );
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<OutboundMessage>,
    handle: Arc<ConnectionHandle>,
) {
    while let Some(msg) = rx.recv().await {
        let closing = matches!(msg, OutboundMessage::Close(_));
        if let Err(err) = sink.send(outbound_to_message(msg)).await {
            debug!(error = %err, "relay write failed");
            handle.mark_closed();
            return;
        }
        if closing {
            handle.mark_closed();
            return;
        }
    }
}
