//! Session orchestration for the agent gateway.
//!
//! Provides:
//! - `SessionHandle` - One streaming connection's identity and outbound queue
//! - `SessionRegistry` - The set of live streaming sessions
//! - `Dispatcher` - Agent invocation shared by single-shot and streaming paths
//! - `Connection` - Per-connection protocol state machine

pub mod connection;
pub mod dispatcher;
pub mod handle;
pub mod registry;

pub use connection::Connection;
pub use dispatcher::{DispatchError, Dispatcher};
pub use handle::{SessionError, SessionHandle, SessionId, SessionState, TransportError};
pub use registry::SessionRegistry;
