//! Invocation context passed to and returned from the agent.

use serde::{Deserialize, Serialize};

/// Thread id used when a single-shot caller does not supply one.
pub const DEFAULT_THREAD_ID: &str = "default";

/// User id used for single-shot callers that do not name themselves.
pub const DEFAULT_API_USER: &str = "api_user";

/// Surface a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Single-shot HTTP request.
    Api,
    /// Streaming WebSocket session.
    Websocket,
}

impl Platform {
    /// Wire and log name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Websocket => "websocket",
        }
    }
}

/// One message handed to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRequest {
    /// User message text.
    pub text: String,
    /// Conversation thread the agent keys history on.
    pub thread_id: String,
    /// Caller identity.
    pub user_id: String,
    /// Display name, when the caller gave one.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Surface the request came from.
    pub platform: Platform,
}

impl AgentRequest {
    /// Create a request for the given text and thread.
    ///
    /// Defaults to the API platform and the anonymous API user.
    #[must_use]
    pub fn new(text: impl Into<String>, thread_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            thread_id: thread_id.into(),
            user_id: DEFAULT_API_USER.to_string(),
            user_name: None,
            platform: Platform::Api,
        }
    }

    /// Set the user id.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Set the display name; it also becomes the user id.
    #[must_use]
    pub fn with_user_name(mut self, user_name: Option<String>) -> Self {
        if let Some(ref name) = user_name {
            self.user_id.clone_from(name);
        }
        self.user_name = user_name;
        self
    }

    /// Set the platform.
    #[must_use]
    pub const fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }
}

/// Final result of one agent invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Reply text.
    pub content: String,
    /// Tools the agent invoked, in call order.
    #[serde(default)]
    pub tools_used: Vec<String>,
}

impl AgentResponse {
    /// Create a response.
    #[must_use]
    pub fn new(content: impl Into<String>, tools_used: Vec<String>) -> Self {
        Self {
            content: content.into(),
            tools_used,
        }
    }

    /// A reply carrying only text, no tools.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(content, Vec::new())
    }
}
