//! Agent invocation contract.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::{AgentRequest, AgentResponse};

/// Failure raised by the agent while handling a request.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AgentError {
    /// Build a failure from any message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Receives tool invocations while the agent is processing.
///
/// Called once per tool call, in call order, before `Agent::process`
/// returns.
pub trait ToolNotifier: Send + Sync {
    /// A tool is about to run with the given arguments.
    fn on_tool_start(&self, tool: &str, arguments: &Value);
}

/// The external conversational agent.
///
/// Reasoning, retries, and tool execution all happen behind this trait.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Process one user message and return the final reply.
    async fn process(
        &self,
        request: &AgentRequest,
        notifier: Option<&dyn ToolNotifier>,
    ) -> Result<AgentResponse, AgentError>;

    /// Forget the conversation history of a thread.
    async fn clear_history(&self, thread_id: &str) -> Result<(), AgentError>;

    /// Number of tools the agent can call.
    fn tools_count(&self) -> usize {
        0
    }
}
