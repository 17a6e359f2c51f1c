//! Per-connection session handle.

use std::{
    sync::{Mutex, PoisonError},
    time::{SystemTime, UNIX_EPOCH},
};

use agent_gateway_core::OutboundFrame;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

/// Session identifier, generated at accept time.
pub type SessionId = Uuid;

/// Protocol lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted, hello not yet sent.
    Connecting,
    /// Waiting for the next inbound frame.
    Idle,
    /// An agent call is in flight.
    Processing,
    /// Terminal.
    Closed,
}

/// Session error.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session closed: {0}")]
    Closed(SessionId),
}

/// Transport error reported by the socket adapter.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Socket error: {0}")]
    Socket(String),
}

/// Handle to one streaming session.
///
/// Outbound frames go through `send`, which refuses every frame once the
/// session is closed. The socket writer drains the other end of the queue.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    thread_id: String,
    created_at: i64,
    state: watch::Sender<SessionState>,
    outbound: Mutex<Option<mpsc::UnboundedSender<OutboundFrame>>>,
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

impl SessionHandle {
    /// Create a session in `Connecting` state.
    ///
    /// Without an explicit thread id, one is derived from the session id.
    #[must_use]
    pub fn new(outbound: mpsc::UnboundedSender<OutboundFrame>, thread_id: Option<String>) -> Self {
        let id = Uuid::new_v4();
        let thread_id = thread_id
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| format!("ws_{id}"));
        let (state, _) = watch::channel(SessionState::Connecting);

        Self {
            id,
            thread_id,
            created_at: now(),
            state,
            outbound: Mutex::new(Some(outbound)),
        }
    }

    /// Session id.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Conversation thread id. Never changes.
    #[must_use]
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Creation time (Unix epoch seconds).
    #[must_use]
    pub const fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Whether the session has closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    /// Move to a new state. `Closed` is never left.
    pub fn set_state(&self, next: SessionState) -> bool {
        self.state.send_if_modified(|current| {
            if *current == SessionState::Closed || *current == next {
                return false;
            }
            *current = next;
            true
        })
    }

    /// Queue a frame for the client.
    ///
    /// # Errors
    /// Returns error if the session is closed or its writer has gone away.
    pub fn send(&self, frame: OutboundFrame) -> Result<(), SessionError> {
        let mut outbound = self
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(tx) = outbound.as_ref() else {
            return Err(SessionError::Closed(self.id));
        };
        if tx.send(frame).is_err() {
            // Writer is gone: the transport failed underneath us.
            outbound.take();
            drop(outbound);
            self.state.send_replace(SessionState::Closed);
            return Err(SessionError::Closed(self.id));
        }
        Ok(())
    }

    /// Push a notification to the client.
    ///
    /// # Errors
    /// Returns error if the session is closed.
    pub fn notify(&self, message: impl Into<String>) -> Result<(), SessionError> {
        self.send(OutboundFrame::Notification {
            message: message.into(),
        })
    }

    /// Close the session.
    ///
    /// Drops the outbound queue so the writer flushes what is pending and
    /// ends. Returns `true` if this call did the closing.
    pub fn close(&self) -> bool {
        let sender = self
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let previous = self.state.send_replace(SessionState::Closed);
        drop(sender);
        previous != SessionState::Closed
    }

    /// Wait until the session is closed.
    pub async fn closed(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| *state == SessionState::Closed).await;
    }
}
