//! # Channel
//!
//! Client side of the realtime channel: one logical "always try to be
//! connected" subscription over a droppable WebSocket.
//!
//! A spawned task owns the socket. Callers talk to it through a
//! [`Channel`] handle and observe it through an event stream; an
//! unintended close schedules a reconnect after a fixed delay until the
//! retry budget is spent. Failures never propagate out of the task; they
//! become status transitions and log lines.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use menu::events::{ServerFrame, ABNORMAL_CLOSURE, NORMAL_CLOSURE};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::{frame::coding::CloseCode, CloseFrame},
    tungstenite::Message,
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

pub mod state;

use state::{ChannelState, ChannelStatus};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type SocketSink = SplitSink<Socket, Message>;
type SocketStream = SplitStream<Socket>;

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub url: String,
    pub max_retries: u32,
    pub retry_interval: Duration,
}

impl ChannelConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_retries: 5,
            retry_interval: Duration::from_secs(3),
        }
    }
}

/// What the agent reports back to its caller, in the order it happened.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Connected,
    Message(ServerFrame),
    Disconnected { code: u16 },
    Error(String),
}

enum Command {
    Send(Value),
    Disconnect,
}

/// Handle to a running channel task.
///
/// Creating the handle is the connect call: the task starts connecting
/// immediately, and there is never more than one underlying socket per
/// handle. Once the retry budget is spent the task ends and the channel
/// stays disconnected until the caller connects a fresh one.
pub struct Channel {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ChannelStatus>,
    last_message: Arc<Mutex<Option<ServerFrame>>>,
}

impl Channel {
    pub fn connect(config: ChannelConfig) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ChannelStatus::Disconnected);
        let last_message = Arc::new(Mutex::new(None));

        tokio::spawn(run(
            config,
            command_rx,
            event_tx,
            status_tx,
            last_message.clone(),
        ));

        (
            Self {
                commands: command_tx,
                status: status_rx,
                last_message,
            },
            event_rx,
        )
    }

    pub fn status(&self) -> ChannelStatus {
        *self.status.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ChannelStatus::Connected
    }

    /// The most recent frame decoded off the wire, if any.
    pub fn last_message(&self) -> Option<ServerFrame> {
        self.last_message.lock().unwrap().clone()
    }

    /// Serialize and write `payload`. Only attempted while connected;
    /// anything else is reported as a failed send and dropped, never
    /// queued.
    pub fn send(&self, payload: Value) -> bool {
        if !self.is_connected() {
            warn!("dropping message, channel is not connected");
            return false;
        }

        self.commands.send(Command::Send(payload)).is_ok()
    }

    /// Close intentionally: cancels any pending retry, sends a normal
    /// closure, and ends the task.
    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }
}

enum SessionEnd {
    Closed(u16),
    Errored(String),
    Shutdown,
}

async fn run(
    config: ChannelConfig,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<ChannelEvent>,
    status: watch::Sender<ChannelStatus>,
    last_message: Arc<Mutex<Option<ServerFrame>>>,
) {
    let mut state = ChannelState::new(config.max_retries, config.retry_interval);

    loop {
        state.on_connecting();
        let _ = status.send(state.status());
        info!(url = %config.url, attempt = state.retries(), "connecting");

        let end = match connect_async(config.url.as_str()).await {
            Ok((socket, _)) => {
                state.on_open();
                let _ = status.send(state.status());
                let _ = events.send(ChannelEvent::Connected);
                info!(url = %config.url, "connected");

                let (sink, stream) = socket.split();
                pump(sink, stream, &mut commands, &events, &last_message).await
            }
            Err(e) => SessionEnd::Errored(e.to_string()),
        };

        let scheduled = match end {
            SessionEnd::Shutdown => {
                state.suppress();
                let _ = status.send(state.status());
                let _ = events.send(ChannelEvent::Disconnected {
                    code: NORMAL_CLOSURE,
                });
                info!("disconnected");
                return;
            }
            SessionEnd::Errored(message) => {
                warn!(error = %message, "channel error");
                state.on_error();
                let _ = status.send(state.status());
                let _ = events.send(ChannelEvent::Error(message));

                // The transport emits no close after a hard failure, so
                // the error is accounted as an abnormal close here.
                let _ = events.send(ChannelEvent::Disconnected {
                    code: ABNORMAL_CLOSURE,
                });
                state.on_close(ABNORMAL_CLOSURE)
            }
            SessionEnd::Closed(code) => {
                let _ = events.send(ChannelEvent::Disconnected { code });
                state.on_close(code)
            }
        };
        let _ = status.send(state.status());

        let Some(delay) = scheduled else {
            info!(retries = state.retries(), "not reconnecting");
            return;
        };

        info!(delay_ms = delay.as_millis() as u64, "reconnect scheduled");
        if !wait_for_retry(delay, &mut commands).await {
            state.suppress();
            let _ = status.send(state.status());
            info!("reconnect cancelled");
            return;
        }
    }
}

/// Sleep out the retry delay. Returns `false` when an explicit disconnect
/// (or a dropped handle) cancels the pending attempt; messages sent while
/// disconnected are dropped on the floor.
async fn wait_for_retry(delay: Duration, commands: &mut mpsc::UnboundedReceiver<Command>) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            command = commands.recv() => match command {
                Some(Command::Send(_)) => debug!("dropping message, channel is reconnecting"),
                Some(Command::Disconnect) | None => return false,
            },
        }
    }
}

async fn pump(
    mut sink: SocketSink,
    mut stream: SocketStream,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    events: &mpsc::UnboundedSender<ChannelEvent>,
    last_message: &Arc<Mutex<Option<ServerFrame>>>,
) -> SessionEnd {
    loop {
        tokio::select! {
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ServerFrame>(&text) {
                    Ok(frame) => {
                        *last_message.lock().unwrap() = Some(frame.clone());
                        let _ = events.send(ChannelEvent::Message(frame));
                    }
                    // Undecodable frames are dropped; the channel stays up.
                    Err(e) => debug!(error = %e, "dropping undecodable frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    let code = frame
                        .map(|f| u16::from(f.code))
                        .unwrap_or(ABNORMAL_CLOSURE);
                    return SessionEnd::Closed(code);
                }
                // Pings are answered by the transport; pongs and binary
                // frames carry nothing for us.
                Some(Ok(_)) => {}
                Some(Err(e)) => return SessionEnd::Errored(e.to_string()),
                None => return SessionEnd::Closed(ABNORMAL_CLOSURE),
            },
            command = commands.recv() => match command {
                Some(Command::Send(payload)) => {
                    if let Err(e) = sink.send(Message::Text(payload.to_string())).await {
                        return SessionEnd::Errored(e.to_string());
                    }
                }
                Some(Command::Disconnect) | None => {
                    let _ = sink
                        .send(Message::Close(Some(CloseFrame {
                            code: CloseCode::Normal,
                            reason: "client disconnect".into(),
                        })))
                        .await;
                    return SessionEnd::Shutdown;
                }
            },
        }
    }
}
