//! # Connection Registry
//!
//! The set of live realtime sessions and the fan-out over it.
//!
//! Each session is represented by the sender half of its writer channel;
//! the socket task that owns the actual sink lives in `ws.rs`. Membership
//! is the only relation: a session is added on accept and removed on
//! close, on error, or on the first failed send, so the set never holds a
//! closed session.
//!
//! Broadcast is best-effort, at-most-once, no acknowledgment. A failure
//! on one session removes that session only; delivery to the rest
//! proceeds.
use std::{borrow::Cow, collections::HashMap, sync::Mutex};

use axum::extract::ws::{close_code, CloseFrame, Message};
use menu::events::ServerFrame;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};
use uuid::Uuid;

pub type SessionId = Uuid;
pub type SessionSender = UnboundedSender<Message>;

#[derive(Default)]
struct Inner {
    sessions: HashMap<SessionId, SessionSender>,
    closed: bool,
}

#[derive(Default)]
pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly accepted session. Returns `false` when the
    /// registry has shut down and no longer accepts sessions.
    pub fn register(&self, id: SessionId, sender: SessionSender) -> bool {
        let mut inner = self.inner.lock().unwrap();

        if inner.closed {
            return false;
        }

        inner.sessions.insert(id, sender);
        info!(client = %id, connected = inner.sessions.len(), "session registered");

        true
    }

    pub fn remove(&self, id: SessionId) {
        let mut inner = self.inner.lock().unwrap();

        if inner.sessions.remove(&id).is_some() {
            info!(client = %id, connected = inner.sessions.len(), "session removed");
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write `frame` to every live session. A session whose channel is
    /// gone is dropped from the set; the rest still get the frame.
    /// Returns how many sessions were sent to.
    pub fn broadcast(&self, frame: &ServerFrame) -> usize {
        let text = match serde_json::to_string(frame) {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "failed to encode broadcast frame");
                return 0;
            }
        };

        let mut inner = self.inner.lock().unwrap();
        let mut stale = Vec::new();

        for (id, sender) in &inner.sessions {
            if sender.send(Message::Text(text.clone())).is_err() {
                stale.push(*id);
            }
        }

        let sent = inner.sessions.len() - stale.len();

        for id in stale {
            warn!(client = %id, "dropping unreachable session");
            inner.sessions.remove(&id);
        }

        sent
    }

    /// Force-close every session with a normal-closure frame and refuse
    /// new registrations from here on.
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;

        info!(connected = inner.sessions.len(), "closing all sessions");

        for (_, sender) in inner.sessions.drain() {
            let _ = sender.send(Message::Close(Some(CloseFrame {
                code: close_code::NORMAL,
                reason: Cow::from("server shutdown"),
            })));
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn test_broadcast_partial_failure_isolation() {
        let registry = Registry::new();

        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();
        let (tx_c, mut rx_c) = mpsc::unbounded_channel();

        assert!(registry.register(Uuid::new_v4(), tx_a));
        assert!(registry.register(Uuid::new_v4(), tx_b));
        assert!(registry.register(Uuid::new_v4(), tx_c));

        // One of the three writer tasks is gone.
        drop(rx_b);

        let sent = registry.broadcast(&ServerFrame::echo(json!({"n": 1})));

        assert_eq!(sent, 2);
        assert_eq!(registry.len(), 2);
        assert!(matches!(rx_a.try_recv(), Ok(Message::Text(_))));
        assert!(matches!(rx_c.try_recv(), Ok(Message::Text(_))));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = Registry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();

        registry.register(id, tx);
        assert_eq!(registry.len(), 1);

        registry.remove(id);
        registry.remove(id);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_shutdown_closes_all_and_rejects_new() {
        let registry = Registry::new();

        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register(Uuid::new_v4(), tx);

        registry.shutdown();

        assert!(registry.is_empty());
        match rx.try_recv() {
            Ok(Message::Close(Some(frame))) => assert_eq!(frame.code, close_code::NORMAL),
            other => panic!("expected close frame, got {other:?}"),
        }

        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(!registry.register(Uuid::new_v4(), tx));
        assert!(registry.is_empty());
    }
}
