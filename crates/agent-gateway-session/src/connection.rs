//! Streaming session protocol state machine.
//!
//! `CONNECTING -> IDLE <-> PROCESSING -> CLOSED`. One inbound frame is
//! handled to completion before the next is read, so a session's outbound
//! frames are strictly ordered. Independent sessions run concurrently.

use std::sync::Arc;

use agent_gateway_core::{
    ActivityState, AgentRequest, InboundFrame, OutboundFrame, Platform, ToolNotifier,
};
use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    dispatcher::{DispatchError, Dispatcher},
    handle::{SessionError, SessionHandle, SessionState, TransportError},
    registry::SessionRegistry,
};

/// Emits `tool.start` frames while the agent is processing.
struct FrameNotifier<'a> {
    session: &'a SessionHandle,
}

impl ToolNotifier for FrameNotifier<'_> {
    fn on_tool_start(&self, tool: &str, arguments: &Value) {
        let frame = OutboundFrame::ToolStart {
            tool: tool.to_string(),
            arguments: arguments.clone(),
        };
        if let Err(e) = self.session.send(frame) {
            tracing::debug!(tool, error = %e, "dropped tool notification");
        }
    }
}

/// One accepted streaming connection.
pub struct Connection {
    session: Arc<SessionHandle>,
    registry: SessionRegistry,
    dispatcher: Dispatcher,
}

impl Connection {
    /// Accept a connection.
    ///
    /// Sends `hello`, registers the session and leaves it `Idle`. Frames for
    /// the client are queued on `outbound`.
    pub async fn accept(
        registry: SessionRegistry,
        dispatcher: Dispatcher,
        outbound: mpsc::UnboundedSender<OutboundFrame>,
        thread_id: Option<String>,
    ) -> Self {
        let session = Arc::new(SessionHandle::new(outbound, thread_id));

        let hello = OutboundFrame::Hello {
            client_id: session.id().to_string(),
            thread_id: session.thread_id().to_string(),
        };
        if let Err(e) = session.send(hello) {
            tracing::debug!(session_id = %session.id(), error = %e, "hello not delivered");
        }
        registry.register(Arc::clone(&session)).await;
        session.set_state(SessionState::Idle);

        tracing::info!(
            session_id = %session.id(),
            thread_id = session.thread_id(),
            "websocket client connected"
        );

        Self {
            session,
            registry,
            dispatcher,
        }
    }

    /// The session handle.
    #[must_use]
    pub const fn session(&self) -> &Arc<SessionHandle> {
        &self.session
    }

    /// Drive the session until the transport ends or the session is closed.
    ///
    /// Always deregisters before returning.
    pub async fn run<S>(self, inbound: S)
    where
        S: Stream<Item = Result<InboundFrame, TransportError>> + Unpin,
    {
        let mut inbound = inbound;

        loop {
            let next = tokio::select! {
                biased;
                () = self.session.closed() => break,
                next = inbound.next() => next,
            };

            let frame = match next {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    tracing::warn!(session_id = %self.session.id(), error = %e, "transport failure");
                    break;
                }
                None => break,
            };

            // A slow agent call must not delay the close.
            let outcome = tokio::select! {
                biased;
                () = self.session.closed() => break,
                outcome = self.on_frame(frame) => outcome,
            };
            if let Err(e) = outcome {
                tracing::debug!(session_id = %self.session.id(), error = %e, "stopping session");
                break;
            }
        }

        self.finish().await;
    }

    async fn on_frame(&self, frame: InboundFrame) -> Result<(), SessionError> {
        match frame {
            InboundFrame::Heartbeat => self.session.send(OutboundFrame::HeartbeatAck),
            InboundFrame::InputText { text } if text.is_empty() => Ok(()),
            InboundFrame::InputText { text } => self.on_text(text).await,
            InboundFrame::Clear => self.on_clear().await,
            InboundFrame::Unrecognized => {
                tracing::trace!(session_id = %self.session.id(), "ignored unrecognized frame");
                Ok(())
            }
        }
    }

    async fn on_text(&self, text: String) -> Result<(), SessionError> {
        let session = &*self.session;
        let thread_id = session.thread_id();
        let platform = Platform::Websocket;

        tracing::info!(
            platform = platform.as_str(),
            user = %format_args!("ws_{}", session.id()),
            thread_id,
            length = text.len(),
            "message received"
        );

        session.set_state(SessionState::Processing);
        session.send(OutboundFrame::state(ActivityState::Thinking))?;

        let request = AgentRequest::new(text, thread_id)
            .with_user_id(format!("ws_{}", session.id()))
            .with_platform(platform);
        let notifier: &dyn ToolNotifier = &FrameNotifier { session };
        let response = self.dispatcher.process(&request, Some(notifier)).await;

        session.send(OutboundFrame::state(ActivityState::Speaking))?;
        session.send(OutboundFrame::TextResponse {
            text: response.content.clone(),
            tools_used: response.tools_used.clone(),
        })?;
        session.send(OutboundFrame::state(ActivityState::Idle))?;
        session.set_state(SessionState::Idle);

        tracing::info!(
            platform = platform.as_str(),
            thread_id,
            tools_used = ?response.tools_used,
            length = response.content.len(),
            "message sent"
        );
        Ok(())
    }

    async fn on_clear(&self) -> Result<(), SessionError> {
        let thread_id = self.session.thread_id();
        match self.dispatcher.clear_history(thread_id).await {
            Ok(()) | Err(DispatchError::AgentNotReady) => {}
            Err(e) => {
                tracing::warn!(session_id = %self.session.id(), thread_id, error = %e, "clear history failed");
            }
        }
        self.session.send(OutboundFrame::Cleared)
    }

    async fn finish(self) {
        self.session.close();
        self.registry.deregister(self.session.id()).await;
        tracing::info!(session_id = %self.session.id(), "websocket client disconnected");
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
