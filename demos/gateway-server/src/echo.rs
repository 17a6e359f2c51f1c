//! Built-in echo agent for trying the gateway without a real model.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use agent_gateway_core::{Agent, AgentError, AgentRequest, AgentResponse, ToolNotifier};
use async_trait::async_trait;
use serde_json::json;

/// Replies with the user's text and a per-thread turn count.
///
/// Messages starting with `/tool <name>` report a call to `<name>` first.
#[derive(Debug, Default)]
pub struct EchoAgent {
    turns: Mutex<HashMap<String, usize>>,
}

impl EchoAgent {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Agent for EchoAgent {
    async fn process(
        &self,
        request: &AgentRequest,
        notifier: Option<&dyn ToolNotifier>,
    ) -> Result<AgentResponse, AgentError> {
        let turn = {
            let mut turns = self.turns.lock().unwrap_or_else(PoisonError::into_inner);
            let turn = turns.entry(request.thread_id.clone()).or_insert(0);
            *turn += 1;
            *turn
        };

        let mut tools_used = Vec::new();
        if let Some(rest) = request.text.strip_prefix("/tool ") {
            let tool = rest.split_whitespace().next().unwrap_or("noop").to_string();
            if let Some(notifier) = notifier {
                notifier.on_tool_start(&tool, &json!({ "input": rest }));
            }
            tools_used.push(tool);
        }

        Ok(AgentResponse::new(
            format!("[{turn}] {}", request.text),
            tools_used,
        ))
    }

    async fn clear_history(&self, thread_id: &str) -> Result<(), AgentError> {
        self.turns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(thread_id);
        Ok(())
    }

    fn tools_count(&self) -> usize {
        1
    }
}
