//! Scripted agent for tests.

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{Agent, AgentError, AgentRequest, AgentResponse, ToolNotifier};

/// Agent that replays a fixed script and records what it was asked.
#[derive(Debug, Default)]
pub struct ScriptedAgent {
    reply: String,
    tool_calls: Vec<(String, Value)>,
    failure: Option<String>,
    clear_failure: Option<String>,
    delay: Option<Duration>,
    tools_count: usize,
    requests: Mutex<Vec<AgentRequest>>,
    cleared: Mutex<Vec<String>>,
}

impl ScriptedAgent {
    /// Agent that always replies with `reply`.
    #[must_use]
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            ..Self::default()
        }
    }

    /// Agent whose every `process` call fails with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Report a tool call before replying.
    #[must_use]
    pub fn with_tool(mut self, tool: impl Into<String>, arguments: Value) -> Self {
        self.tool_calls.push((tool.into(), arguments));
        self
    }

    /// Sleep before replying.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Advertise a tool count.
    #[must_use]
    pub const fn with_tools_count(mut self, tools_count: usize) -> Self {
        self.tools_count = tools_count;
        self
    }

    /// Fail every `clear_history` call with `message`.
    #[must_use]
    pub fn with_clear_failure(mut self, message: impl Into<String>) -> Self {
        self.clear_failure = Some(message.into());
        self
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<AgentRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Threads cleared so far.
    #[must_use]
    pub fn cleared(&self) -> Vec<String> {
        self.cleared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    async fn process(
        &self,
        request: &AgentRequest,
        notifier: Option<&dyn ToolNotifier>,
    ) -> Result<AgentResponse, AgentError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(ref message) = self.failure {
            return Err(AgentError::failed(message.clone()));
        }

        let mut tools_used = Vec::with_capacity(self.tool_calls.len());
        for (tool, arguments) in &self.tool_calls {
            if let Some(notifier) = notifier {
                notifier.on_tool_start(tool, arguments);
            }
            tools_used.push(tool.clone());
        }

        Ok(AgentResponse::new(self.reply.clone(), tools_used))
    }

    async fn clear_history(&self, thread_id: &str) -> Result<(), AgentError> {
        if let Some(ref message) = self.clear_failure {
            return Err(AgentError::failed(message.clone()));
        }
        self.cleared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(thread_id.to_string());
        Ok(())
    }

    fn tools_count(&self) -> usize {
        self.tools_count
    }
}
