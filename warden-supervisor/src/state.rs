//! Agent server state as seen by lifecycle operations
//!
//! The state carries the two collaborators a lifecycle call needs (the child supervisor and
//! the signal dispatcher). Everything else is passed through untouched.

use crate::child::ChildSupervisor;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use warden_core::dispatch::Dispatcher;
use warden_core::signal::Signal;

/// Agent server status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Starting its workers
    Initializing,
    #[default]
    Idle,
    /// Workers started, serving
    Running,
    /// Tearing its workers down
    Stopping,
}

/// State of a running agent server
#[derive(Clone)]
pub struct AgentServerState {
    /// Agent ID, used as the source of emitted signals
    pub agent_id: String,

    pub status: AgentStatus,

    /// Signals queued for the agent
    pub pending_signals: VecDeque<Signal>,

    /// The agent's own data
    pub agent: serde_json::Value,

    child_supervisor: Arc<dyn ChildSupervisor>,
    dispatcher: Dispatcher,
}

impl AgentServerState {
    /// Create a new state for `agent_id`
    pub fn new(
        agent_id: impl Into<String>,
        child_supervisor: Arc<dyn ChildSupervisor>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            status: AgentStatus::default(),
            pending_signals: VecDeque::new(),
            agent: serde_json::Value::Null,
            child_supervisor,
            dispatcher,
        }
    }

    /// Set the agent payload
    pub fn with_agent(mut self, agent: serde_json::Value) -> Self {
        self.agent = agent;
        self
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn child_supervisor(&self) -> &dyn ChildSupervisor {
        self.child_supervisor.as_ref()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Whether `other` has the same fields and shares the same collaborators
    pub fn same_as(&self, other: &AgentServerState) -> bool {
        self.agent_id == other.agent_id
            && self.status == other.status
            && self.pending_signals == other.pending_signals
            && self.agent == other.agent
            && Arc::ptr_eq(&self.child_supervisor, &other.child_supervisor)
    }
}

impl fmt::Debug for AgentServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentServerState")
            .field("agent_id", &self.agent_id)
            .field("status", &self.status)
            .field("pending_signals", &self.pending_signals.len())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}
