//! Registry of live streaming sessions.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use agent_gateway_core::OutboundFrame;
use tokio::sync::RwLock;

use crate::handle::{SessionError, SessionHandle, SessionId};

/// Set of currently open streaming sessions.
///
/// Membership changes and iteration are safe under concurrent access.
/// Iteration always works on a point-in-time snapshot, so sessions leaving
/// mid-broadcast never disturb the rest. Cheap to clone.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<SessionHandle>>>>,
    // Written only while holding the `sessions` write lock.
    shut_down: Arc<AtomicBool>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session. No-op if it is already registered.
    ///
    /// After [`shutdown`](Self::shutdown) the session is closed instead of
    /// added. Returns `true` if the session was added.
    pub async fn register(&self, session: Arc<SessionHandle>) -> bool {
        let mut sessions = self.sessions.write().await;
        if self.shut_down.load(Ordering::Acquire) {
            tracing::debug!(session_id = %session.id(), "registry shut down; closing session");
            session.close();
            return false;
        }
        if sessions.contains_key(&session.id()) {
            return false;
        }
        tracing::debug!(session_id = %session.id(), thread_id = session.thread_id(), "session registered");
        sessions.insert(session.id(), session);
        true
    }

    /// Remove a session. No-op if absent.
    ///
    /// Returns `true` if the session was removed.
    pub async fn deregister(&self, session_id: SessionId) -> bool {
        let removed = self.sessions.write().await.remove(&session_id).is_some();
        if removed {
            tracing::debug!(%session_id, "session deregistered");
        }
        removed
    }

    /// Get a registered session.
    pub async fn get(&self, session_id: SessionId) -> Option<Arc<SessionHandle>> {
        self.sessions.read().await.get(&session_id).cloned()
    }

    /// Number of registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session is registered.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Point-in-time copy of the member set.
    pub async fn snapshot(&self) -> Vec<Arc<SessionHandle>> {
        self.sessions.read().await.values().cloned().collect()
    }

    /// Apply `visit` to every session in a snapshot of the member set.
    ///
    /// A failure on one session never stops the others; failures are logged
    /// and returned. No ordering across sessions.
    pub async fn broadcast_or_close<F>(&self, mut visit: F) -> Vec<(SessionId, SessionError)>
    where
        F: FnMut(&SessionHandle) -> Result<(), SessionError>,
    {
        let mut failures = Vec::new();
        for session in self.snapshot().await {
            if let Err(e) = visit(&session) {
                tracing::debug!(session_id = %session.id(), error = %e, "session skipped");
                failures.push((session.id(), e));
            }
        }
        failures
    }

    /// Send a frame to every session. Returns how many accepted it.
    pub async fn broadcast(&self, frame: &OutboundFrame) -> usize {
        let mut delivered = 0;
        let failures = self
            .broadcast_or_close(|session| {
                session.send(frame.clone())?;
                delivered += 1;
                Ok(())
            })
            .await;
        if !failures.is_empty() {
            tracing::warn!(failed = failures.len(), "broadcast did not reach every session");
        }
        delivered
    }

    /// Push a notification to one session.
    ///
    /// # Errors
    /// Returns error if the session is not registered or already closed.
    pub async fn notify(
        &self,
        session_id: SessionId,
        message: impl Into<String>,
    ) -> Result<(), SessionError> {
        let session = self
            .get(session_id)
            .await
            .ok_or(SessionError::Closed(session_id))?;
        session.notify(message).inspect_err(|e| {
            tracing::error!(%session_id, error = %e, "failed to send notification");
        })
    }

    /// Close every registered session. Returns how many were closed.
    ///
    /// Each session's owning task deregisters it once it notices the close.
    pub async fn close_all(&self) -> usize {
        let mut closed = 0;
        let _ = self
            .broadcast_or_close(|session| {
                if session.close() {
                    closed += 1;
                }
                Ok(())
            })
            .await;
        tracing::info!(closed, "closed all streaming sessions");
        closed
    }

    /// Refuse new sessions from now on and close every registered one.
    ///
    /// Returns how many were closed.
    pub async fn shutdown(&self) -> usize {
        {
            let _sessions = self.sessions.write().await;
            self.shut_down.store(true, Ordering::Release);
        }
        self.close_all().await
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use agent_gateway_core::OutboundFrame;
    use tokio::sync::mpsc;

    use super::*;

    fn make_session() -> (Arc<SessionHandle>, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(SessionHandle::new(tx, None)), rx)
    }

    fn notification(message: &str) -> OutboundFrame {
        OutboundFrame::Notification {
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn register_is_idempotent() {
        let registry = SessionRegistry::new();
        let (session, _rx) = make_session();

        assert!(registry.register(session.clone()).await);
        assert!(!registry.register(session.clone()).await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn deregister_absent_is_noop() {
        let registry = SessionRegistry::new();
        let (session, _rx) = make_session();

        assert!(!registry.deregister(session.id()).await);
        registry.register(session.clone()).await;
        assert!(registry.deregister(session.id()).await);
        assert!(!registry.deregister(session.id()).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_open_session() {
        let registry = SessionRegistry::new();
        let (s1, mut rx1) = make_session();
        let (s2, mut rx2) = make_session();
        registry.register(s1).await;
        registry.register(s2).await;

        assert_eq!(registry.broadcast(&notification("hi")).await, 2);
        assert_eq!(rx1.try_recv().unwrap(), notification("hi"));
        assert_eq!(rx2.try_recv().unwrap(), notification("hi"));
    }

    #[tokio::test]
    async fn broadcast_continues_past_closed_session() {
        let registry = SessionRegistry::new();
        let (open, mut open_rx) = make_session();
        let (closed, _closed_rx) = make_session();
        registry.register(open.clone()).await;
        registry.register(closed.clone()).await;
        closed.close();

        let failures = registry
            .broadcast_or_close(|session| session.send(notification("ping")))
            .await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, closed.id());
        assert_eq!(open_rx.try_recv().unwrap(), notification("ping"));
    }

    #[tokio::test]
    async fn notify_unknown_session_fails() {
        let registry = SessionRegistry::new();
        let (session, mut rx) = make_session();
        assert!(registry.notify(session.id(), "lost").await.is_err());

        registry.register(session.clone()).await;
        registry.notify(session.id(), "found").await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), notification("found"));
    }

    #[tokio::test]
    async fn close_all_closes_members() {
        let registry = SessionRegistry::new();
        let (s1, _rx1) = make_session();
        let (s2, _rx2) = make_session();
        registry.register(s1.clone()).await;
        registry.register(s2.clone()).await;

        assert_eq!(registry.close_all().await, 2);
        assert!(s1.is_closed());
        assert!(s2.is_closed());
        assert_eq!(registry.close_all().await, 0);
    }

    #[tokio::test]
    async fn register_after_shutdown_closes_session() {
        let registry = SessionRegistry::new();
        let (early, _rx1) = make_session();
        registry.register(early.clone()).await;

        assert_eq!(registry.shutdown().await, 1);
        assert!(registry.is_shut_down());
        assert!(early.is_closed());

        let (late, _rx2) = make_session();
        assert!(!registry.register(late.clone()).await);
        assert!(late.is_closed());
        assert!(registry.get(late.id()).await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn deregister_during_broadcast_spares_survivors() {
        const SESSIONS: usize = 64;

        let registry = SessionRegistry::new();
        let mut survivors = Vec::new();
        let mut leavers = Vec::new();
        for i in 0..SESSIONS {
            let (session, rx) = make_session();
            registry.register(session.clone()).await;
            if i % 2 == 0 {
                survivors.push((session, rx));
            } else {
                leavers.push(session);
            }
        }

        let leaving = leavers.into_iter().map(|session| {
            let registry = registry.clone();
            tokio::spawn(async move {
                session.close();
                registry.deregister(session.id()).await;
            })
        });
        let leaving: Vec<_> = leaving.collect();

        let broadcaster = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.broadcast(&notification("all")).await })
        };

        for task in leaving {
            task.await.unwrap();
        }
        let delivered = broadcaster.await.unwrap();
        assert!(delivered >= SESSIONS / 2);

        for (session, mut rx) in survivors {
            assert_eq!(rx.try_recv().unwrap(), notification("all"));
            assert!(rx.try_recv().is_err(), "duplicate delivery");
            assert!(!session.is_closed());
        }
        assert_eq!(registry.len().await, SESSIONS / 2);
    }
}
