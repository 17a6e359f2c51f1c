//! WebSocket transport for streaming sessions.

use std::sync::Arc;

use agent_gateway_core::{InboundFrame, OutboundFrame};
use agent_gateway_session::{Connection, SessionHandle, TransportError};
use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::server::AppState;

/// Query parameters accepted on upgrade.
#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    /// Pin the session to an existing conversation thread.
    pub thread_id: Option<String>,
}

/// WebSocket upgrade handler.
///
/// Use this as an Axum route handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params.thread_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, thread_id: Option<String>) {
    let (sender, receiver) = socket.split();

    // Channel for sending frames to the client
    let (tx, rx) = mpsc::unbounded_channel::<OutboundFrame>();

    let connection = Connection::accept(
        state.registry.clone(),
        state.dispatcher.clone(),
        tx,
        thread_id,
    )
    .await;
    let session = Arc::clone(connection.session());

    let send_task = tokio::spawn(write_frames(sender, rx, Arc::clone(&session)));

    // The reader must keep draining the socket while an agent call is in flight.
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let recv_task = tokio::spawn(read_frames(receiver, inbound_tx, Arc::clone(&session)));

    connection.run(UnboundedReceiverStream::new(inbound_rx)).await;

    // Closing the session dropped the queue; the writer flushes and says goodbye.
    if let Err(e) = send_task.await {
        tracing::debug!(session_id = %session.id(), error = %e, "writer task ended abnormally");
    }
    recv_task.abort();
}

/// Forward queued frames to the socket until the queue closes.
async fn write_frames(
    mut sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<OutboundFrame>,
    session: Arc<SessionHandle>,
) {
    while let Some(frame) = rx.recv().await {
        let json = match frame.encode() {
            Ok(j) => j,
            Err(e) => {
                tracing::error!("Failed to serialize frame: {e}");
                continue;
            }
        };
        if sender.send(Message::Text(json.into())).await.is_err() {
            session.close();
            return;
        }
    }
    let _ = sender.send(Message::Close(None)).await;
}

/// Decode socket messages into frames until the client goes away.
async fn read_frames(
    mut receiver: SplitStream<WebSocket>,
    inbound: mpsc::UnboundedSender<Result<InboundFrame, TransportError>>,
    session: Arc<SessionHandle>,
) {
    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text.as_str().to_owned(),
            Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                Ok(s) => s,
                Err(_) => continue,
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::error!("WebSocket error: {e}");
                let _ = inbound.send(Err(TransportError::Socket(e.to_string())));
                break;
            }
        };

        let frame = match InboundFrame::decode(&text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(session_id = %session.id(), "Invalid client frame: {e}");
                continue;
            }
        };
        if inbound.send(Ok(frame)).is_err() {
            break;
        }
    }

    // The state machine may be stuck in an agent call; closing wakes it.
    session.close();
}
