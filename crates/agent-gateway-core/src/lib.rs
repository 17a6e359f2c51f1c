//! Core abstractions for the agent gateway.
//!
//! This crate provides the fundamental building blocks:
//! - `Agent` / `ToolNotifier` - The narrow contract into the external agent
//! - `AgentRequest` / `AgentResponse` - Values crossing that contract
//! - `InboundFrame` / `OutboundFrame` - Streaming wire protocol
//! - `AgentSlot` - Late-bindable shared agent reference

pub mod context;
pub mod protocol;
pub mod slot;
pub mod traits;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use context::{AgentRequest, AgentResponse, Platform};
pub use protocol::{ActivityState, InboundFrame, OutboundFrame};
pub use slot::{AgentSlot, AgentStatus};
pub use traits::{Agent, AgentError, ToolNotifier};
