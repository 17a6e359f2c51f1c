//! Agent invocation shared by single-shot requests and streaming sessions.

use std::sync::Arc;

use agent_gateway_core::{
    Agent, AgentError, AgentRequest, AgentResponse, AgentSlot, AgentStatus, Platform, ToolNotifier,
};

/// Reply content when no agent is bound on the streaming path.
pub const AGENT_NOT_READY_MESSAGE: &str = "Agent not initialized";

/// Dispatcher error.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Agent not initialized")]
    AgentNotReady,
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),
}

/// Routes requests into the bound agent.
///
/// Agent failures never escape `process`: they come back as a normal
/// response whose content is `"Error: <message>"`. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    agent: AgentSlot,
}

impl Dispatcher {
    /// Create a dispatcher over an agent slot.
    #[must_use]
    pub const fn new(agent: AgentSlot) -> Self {
        Self { agent }
    }

    /// The agent slot.
    #[must_use]
    pub const fn agent(&self) -> &AgentSlot {
        &self.agent
    }

    /// Readiness of the bound agent.
    #[must_use]
    pub fn status(&self) -> AgentStatus {
        self.agent.status()
    }

    /// Single-shot request/response call.
    ///
    /// Tool notifications are a streaming feature, so none is passed.
    ///
    /// # Errors
    /// Returns `AgentNotReady` if no agent is bound.
    pub async fn dispatch(
        &self,
        text: &str,
        thread_id: &str,
        user_name: Option<&str>,
    ) -> Result<AgentResponse, DispatchError> {
        let agent = self.agent.get().ok_or(DispatchError::AgentNotReady)?;

        let request = AgentRequest::new(text, thread_id)
            .with_user_name(user_name.map(ToString::to_string))
            .with_platform(Platform::Api);

        tracing::info!(
            platform = Platform::Api.as_str(),
            user = %request.user_id,
            thread_id,
            length = text.len(),
            "message received"
        );
        let response = invoke(&agent, &request, None).await;
        tracing::info!(
            platform = Platform::Api.as_str(),
            thread_id,
            tools_used = ?response.tools_used,
            length = response.content.len(),
            "message sent"
        );

        Ok(response)
    }

    /// Run one request through the agent.
    ///
    /// Never fails: a missing agent or an agent error becomes reply text.
    pub async fn process(
        &self,
        request: &AgentRequest,
        notifier: Option<&dyn ToolNotifier>,
    ) -> AgentResponse {
        match self.agent.get() {
            Some(agent) => invoke(&agent, request, notifier).await,
            None => AgentResponse::text(AGENT_NOT_READY_MESSAGE),
        }
    }

    /// Clear a thread's history.
    ///
    /// # Errors
    /// Returns `AgentNotReady` if no agent is bound, or the agent's failure.
    pub async fn clear_history(&self, thread_id: &str) -> Result<(), DispatchError> {
        let agent = self.agent.get().ok_or(DispatchError::AgentNotReady)?;
        agent.clear_history(thread_id).await?;
        tracing::info!(thread_id, "history cleared");
        Ok(())
    }
}

/// Call the agent, turning a failure into reply text.
async fn invoke(
    agent: &Arc<dyn Agent>,
    request: &AgentRequest,
    notifier: Option<&dyn ToolNotifier>,
) -> AgentResponse {
    match agent.process(request, notifier).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                platform = request.platform.as_str(),
                thread_id = %request.thread_id,
                user = %request.user_id,
                error = %e,
                "agent invocation failed"
            );
            AgentResponse::text(format!("Error: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use agent_gateway_core::testing::ScriptedAgent;
    use serde_json::json;
    use tokio_test::assert_ok;

    use super::*;

    fn dispatcher_with(agent: ScriptedAgent) -> (Dispatcher, Arc<ScriptedAgent>) {
        let agent = Arc::new(agent);
        let dispatcher = Dispatcher::new(AgentSlot::with_agent(agent.clone()));
        (dispatcher, agent)
    }

    #[tokio::test]
    async fn test_dispatch_without_agent_is_not_ready() {
        let dispatcher = Dispatcher::default();
        let result = dispatcher.dispatch("hi", "t1", None).await;
        assert!(matches!(result, Err(DispatchError::AgentNotReady)));
    }

    #[tokio::test]
    async fn test_dispatch_returns_agent_result() {
        let (dispatcher, agent) =
            dispatcher_with(ScriptedAgent::new("hi back").with_tool("search", json!({})));

        let response = assert_ok!(dispatcher.dispatch("hi", "t1", None).await);
        assert_eq!(response, AgentResponse::new("hi back", vec!["search".to_string()]));

        let requests = agent.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].thread_id, "t1");
        assert_eq!(requests[0].user_id, "api_user");
        assert_eq!(requests[0].platform, Platform::Api);
    }

    #[tokio::test]
    async fn test_dispatch_passes_user_name() {
        let (dispatcher, agent) = dispatcher_with(ScriptedAgent::new("ok"));
        assert_ok!(dispatcher.dispatch("hi", "t1", Some("grace")).await);
        assert_eq!(agent.requests()[0].user_name.as_deref(), Some("grace"));
        assert_eq!(agent.requests()[0].user_id, "grace");
    }

    #[tokio::test]
    async fn test_agent_failure_becomes_content() {
        let (dispatcher, _agent) = dispatcher_with(ScriptedAgent::failing("boom"));
        let response = assert_ok!(dispatcher.dispatch("hi", "t1", None).await);
        assert_eq!(response.content, "Error: boom");
        assert!(response.tools_used.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_keeps_agent_across_unbind() {
        let (dispatcher, _agent) = dispatcher_with(
            ScriptedAgent::new("still here").with_delay(Duration::from_millis(100)),
        );

        let call = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.dispatch("hi", "t1", None).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(dispatcher.agent().unbind().is_some());

        let response = assert_ok!(call.await.unwrap());
        assert_eq!(response.content, "still here");
        assert!(matches!(
            dispatcher.dispatch("hi", "t1", None).await,
            Err(DispatchError::AgentNotReady)
        ));
    }

    #[tokio::test]
    async fn test_process_without_agent_replies() {
        let dispatcher = Dispatcher::default();
        let response = dispatcher
            .process(&AgentRequest::new("hi", "t1"), None)
            .await;
        assert_eq!(response.content, AGENT_NOT_READY_MESSAGE);
    }

    #[tokio::test]
    async fn test_clear_history() {
        let dispatcher = Dispatcher::default();
        assert!(matches!(
            dispatcher.clear_history("t1").await,
            Err(DispatchError::AgentNotReady)
        ));

        let (dispatcher, agent) = dispatcher_with(ScriptedAgent::new("ok"));
        assert_ok!(dispatcher.clear_history("t1").await);
        assert_eq!(agent.cleared(), vec!["t1"]);

        let (dispatcher, _agent) =
            dispatcher_with(ScriptedAgent::new("ok").with_clear_failure("disk full"));
        assert!(matches!(
            dispatcher.clear_history("t1").await,
            Err(DispatchError::Agent(_))
        ));
    }
}
