//! Signal records delivered to dispatch sinks
//!
//! A [`Signal`] is a namespaced, timestamped event envelope. The `signal_type` is a dotted
//! path (for example `warden.agent.event.process_started`) and `data` carries the
//! category-specific payload as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event signal emitted by an agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signal {
    /// Unique signal ID
    pub id: Uuid,

    /// Namespaced signal type
    #[serde(rename = "type")]
    pub signal_type: String,

    /// Emitting agent (or "system")
    pub source: String,

    /// When the signal was created
    pub time: DateTime<Utc>,

    /// Signal payload
    pub data: serde_json::Value,
}

impl Signal {
    /// Create a new signal with a fresh ID and the current time
    pub fn new(
        signal_type: impl Into<String>,
        source: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            signal_type: signal_type.into(),
            source: source.into(),
            time: Utc::now(),
            data,
        }
    }

    /// Build a signal type by joining a namespace and a name with `.`
    pub fn join_type(namespace: &str, name: &str) -> String {
        if namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", namespace, name)
        }
    }

    /// Whether this signal's type lives under the given namespace
    pub fn is_in_namespace(&self, namespace: &str) -> bool {
        self.signal_type
            .strip_prefix(namespace)
            .is_some_and(|rest| rest.starts_with('.'))
    }
}
