//! Transport layer for the agent gateway.
//!
//! Provides:
//! - Gateway configuration (TOML)
//! - REST endpoints (`/`, `/status`, `/chat`, `/clear`)
//! - WebSocket streaming endpoint (feature: websocket)
//! - `Gateway` server wrapper with session shutdown

pub mod config;
pub mod http;
pub mod server;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use agent_gateway_core::protocol::{InboundFrame, OutboundFrame};
pub use config::{ConfigError, GatewayConfig};
pub use http::ApiError;
pub use server::{AppState, Gateway};
