//! Late-bindable reference to the shared agent.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::Agent;

/// Readiness snapshot of the bound agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    /// An agent is bound.
    pub ready: bool,
    /// Number of tools the bound agent exposes.
    pub tools_count: usize,
}

/// Shared slot holding the agent, if one is bound.
///
/// The gateway can start serving before the agent is ready; callers check
/// the slot on every invocation. Cheap to clone.
#[derive(Clone, Default)]
pub struct AgentSlot {
    inner: Arc<RwLock<Option<Arc<dyn Agent>>>>,
}

impl AgentSlot {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a slot with an agent already bound.
    #[must_use]
    pub fn with_agent(agent: Arc<dyn Agent>) -> Self {
        let slot = Self::new();
        slot.bind(agent);
        slot
    }

    /// Bind an agent, replacing any previous one.
    pub fn bind(&self, agent: Arc<dyn Agent>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(agent);
        tracing::info!("agent bound");
    }

    /// Remove the bound agent.
    pub fn unbind(&self) -> Option<Arc<dyn Agent>> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Get the bound agent.
    #[must_use]
    pub fn get(&self) -> Option<Arc<dyn Agent>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether an agent is bound.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.get().is_some()
    }

    /// Current readiness.
    #[must_use]
    pub fn status(&self) -> AgentStatus {
        self.get().map_or(
            AgentStatus {
                ready: false,
                tools_count: 0,
            },
            |agent| AgentStatus {
                ready: true,
                tools_count: agent.tools_count(),
            },
        )
    }
}

impl std::fmt::Debug for AgentSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSlot")
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedAgent;

    #[test]
    fn test_empty_slot_not_ready() {
        let slot = AgentSlot::new();
        assert!(!slot.is_ready());
        assert_eq!(
            slot.status(),
            AgentStatus {
                ready: false,
                tools_count: 0
            }
        );
    }

    #[test]
    fn test_bind_reports_tools() {
        let slot = AgentSlot::new();
        slot.bind(Arc::new(ScriptedAgent::new("ok").with_tools_count(3)));
        assert_eq!(
            slot.status(),
            AgentStatus {
                ready: true,
                tools_count: 3
            }
        );
    }

    #[test]
    fn test_clones_share_binding() {
        let slot = AgentSlot::new();
        let other = slot.clone();
        other.bind(Arc::new(ScriptedAgent::new("ok")));
        assert!(slot.is_ready());

        assert!(slot.unbind().is_some());
        assert!(!other.is_ready());
    }
}
