//! Wire protocol for streaming sessions.
//!
//! Frames are JSON objects tagged by a `type` field. The tag and field
//! names are the compatibility surface with existing clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frame from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundFrame {
    /// Keepalive.
    #[serde(rename = "heartbeat")]
    Heartbeat,
    /// User message for the agent.
    #[serde(rename = "input.text")]
    InputText {
        #[serde(default)]
        text: String,
    },
    /// Forget the session's conversation history.
    #[serde(rename = "clear")]
    Clear,
    /// Any tag this server does not know.
    #[serde(other)]
    Unrecognized,
}

impl InboundFrame {
    /// Decode a frame from its JSON text.
    ///
    /// # Errors
    /// Returns error if the text is not a JSON object with a string `type`.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// What the session is doing, as shown to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivityState {
    Thinking,
    Speaking,
    Idle,
}

/// Frame from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundFrame {
    /// First frame of every session.
    #[serde(rename = "hello")]
    Hello { client_id: String, thread_id: String },
    /// Reply to a heartbeat.
    #[serde(rename = "heartbeat_ack")]
    HeartbeatAck,
    /// Activity change.
    #[serde(rename = "state.change")]
    StateChange { state: ActivityState },
    /// The agent started a tool.
    #[serde(rename = "tool.start")]
    ToolStart { tool: String, arguments: Value },
    /// Final agent reply.
    #[serde(rename = "text.response")]
    TextResponse { text: String, tools_used: Vec<String> },
    /// History was cleared.
    #[serde(rename = "cleared")]
    Cleared,
    /// Server-initiated push.
    #[serde(rename = "notification")]
    Notification { message: String },
}

impl OutboundFrame {
    /// Create a state change frame.
    #[must_use]
    pub const fn state(state: ActivityState) -> Self {
        Self::StateChange { state }
    }

    /// Encode the frame as JSON text.
    ///
    /// # Errors
    /// Returns error if a tool argument value cannot be serialized.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
