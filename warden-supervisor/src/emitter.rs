//! Lifecycle signals
//!
//! Every process transition is announced with a signal whose type is the event namespace
//! joined with one of `process_started`, `process_terminated` or `process_failed`. The
//! payload is a [`LifecyclePayload`] serialized into the signal's `data`.
//!
//! Emission never fails: a sink that cannot take the signal is logged and skipped.

use crate::child::ProcessHandle;
use crate::error::SupervisorError;
use crate::spec::ProcessSpec;
use crate::state::AgentServerState;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};
use warden_core::signal::Signal;

/// Namespace lifecycle signal types live under
pub const EVENT_NAMESPACE: &str = "warden.agent.event";

/// Kind of process transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleCategory {
    Started,
    Terminated,
    Failed,
}

impl LifecycleCategory {
    /// Name used in the signal type
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleCategory::Started => "process_started",
            LifecycleCategory::Terminated => "process_terminated",
            LifecycleCategory::Failed => "process_failed",
        }
    }

    /// Parse the last segment of a signal type
    pub fn from_signal_type(signal_type: &str) -> Option<Self> {
        match signal_type.rsplit('.').next()? {
            "process_started" => Some(LifecycleCategory::Started),
            "process_terminated" => Some(LifecycleCategory::Terminated),
            "process_failed" => Some(LifecycleCategory::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data attached to a lifecycle signal
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LifecyclePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<ProcessHandle>,

    /// The spec exactly as the caller submitted it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<ProcessSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SupervisorError>,
}

impl LifecyclePayload {
    pub fn started(handle: ProcessHandle, spec: ProcessSpec) -> Self {
        Self {
            handle: Some(handle),
            spec: Some(spec),
            error: None,
        }
    }

    pub fn terminated(handle: ProcessHandle) -> Self {
        Self {
            handle: Some(handle),
            ..Default::default()
        }
    }

    /// A spec that could not be started
    pub fn start_failed(spec: ProcessSpec, error: SupervisorError) -> Self {
        Self {
            handle: None,
            spec: Some(spec),
            error: Some(error),
        }
    }

    /// A terminate refused for a reason other than an unknown handle
    pub fn terminate_failed(handle: ProcessHandle, error: SupervisorError) -> Self {
        Self {
            handle: Some(handle),
            spec: None,
            error: Some(error),
        }
    }

    /// A restart whose terminate step failed
    pub fn restart_failed(
        handle: ProcessHandle,
        spec: ProcessSpec,
        error: SupervisorError,
    ) -> Self {
        Self {
            handle: Some(handle),
            spec: Some(spec),
            error: Some(error),
        }
    }
}

/// A lifecycle signal read back from a sink
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleEvent {
    pub category: LifecycleCategory,
    pub source: String,
    pub payload: LifecyclePayload,
}

impl LifecycleEvent {
    /// Parse a signal; `None` for anything that is not a lifecycle signal
    pub fn from_signal(signal: &Signal) -> Option<Self> {
        let category = LifecycleCategory::from_signal_type(&signal.signal_type)?;
        let payload = serde_json::from_value(signal.data.clone()).ok()?;
        Some(Self {
            category,
            source: signal.source.clone(),
            payload,
        })
    }
}

/// Builds lifecycle signals and hands them to the state's dispatcher
#[derive(Debug, Clone)]
pub struct LifecycleEmitter {
    namespace: String,
}

impl Default for LifecycleEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleEmitter {
    pub fn new() -> Self {
        Self::with_namespace(EVENT_NAMESPACE)
    }

    /// Emitter using a custom namespace
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Full signal type for a category
    pub fn signal_type(&self, category: LifecycleCategory) -> String {
        Signal::join_type(&self.namespace, category.as_str())
    }

    /// Build the signal without delivering it
    pub fn build_signal(
        &self,
        state: &AgentServerState,
        category: LifecycleCategory,
        payload: &LifecyclePayload,
    ) -> serde_json::Result<Signal> {
        let data = serde_json::to_value(payload)?;
        Ok(Signal::new(
            self.signal_type(category),
            state.agent_id.clone(),
            data,
        ))
    }

    /// Build and deliver a signal to every sink of the state's dispatcher
    pub async fn emit(
        &self,
        state: &AgentServerState,
        category: LifecycleCategory,
        payload: LifecyclePayload,
    ) {
        let signal = match self.build_signal(state, category, &payload) {
            Ok(signal) => signal,
            Err(e) => {
                warn!(
                    agent_id = %state.agent_id,
                    %category,
                    error = %e,
                    "Failed to build lifecycle signal"
                );
                return;
            }
        };

        debug!(
            agent_id = %state.agent_id,
            signal_type = %signal.signal_type,
            "Emitting lifecycle signal"
        );
        if let Err(e) = state.dispatcher().dispatch(&signal).await {
            warn!(
                agent_id = %state.agent_id,
                signal_type = %signal.signal_type,
                error = %e,
                "Lifecycle signal delivery failed"
            );
        }
    }
}
