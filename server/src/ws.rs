//! Socket lifecycle for the realtime endpoint.
//!
//! One writer task per session forwards its registry channel to the
//! sink; the reader loop below handles the demonstration protocol (JSON
//! in, echo out) and keepalive. All failures end at this session: log,
//! remove, done.
use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use menu::events::ServerFrame;
use serde_json::Value;
use tokio::{sync::mpsc, time::interval};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{registry::SessionSender, state::AppState};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel();

    if !state.registry.register(id, tx.clone()) {
        // Shutting down; the handshake already happened, so just close.
        let mut socket = socket;
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    send_frame(&tx, &ServerFrame::connection("connected to order updates"));

    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let closing = matches!(message, Message::Close(_));

            if sink.send(message).await.is_err() || closing {
                break;
            }
        }
    });

    // Liveness probe. A peer that stops answering is reaped by the
    // transport timeout, not by us.
    let keepalive_tx = tx.clone();
    let keepalive_secs = state.config.keepalive_secs;
    let keepalive = tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(keepalive_secs));
        ticker.tick().await;

        loop {
            ticker.tick().await;

            if keepalive_tx.send(Message::Ping(Vec::new())).is_err() {
                break;
            }
        }
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<Value>(&text) {
                Ok(data) => send_frame(&tx, &ServerFrame::echo(data)),
                Err(e) => {
                    debug!(client = %id, error = %e, "malformed frame");
                    send_frame(&tx, &ServerFrame::error("malformed JSON frame"));
                }
            },
            Ok(Message::Ping(data)) => {
                let _ = tx.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                info!(client = %id, "session closed by peer");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(client = %id, error = %e, "session error");
                break;
            }
        }
    }

    state.registry.remove(id);
    keepalive.abort();
    writer.abort();
}

fn send_frame(tx: &SessionSender, frame: &ServerFrame) {
    match serde_json::to_string(frame) {
        Ok(text) => {
            let _ = tx.send(Message::Text(text));
        }
        Err(e) => warn!(error = %e, "failed to encode frame"),
    }
}
