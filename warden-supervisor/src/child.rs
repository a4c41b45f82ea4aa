//! Child-supervision primitive and the handles it hands out

use crate::error::ChildError;
use crate::spec::ChildDescriptor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Supervisor that owns an agent's worker processes
#[async_trait]
pub trait ChildSupervisor: Send + Sync {
    /// Start a worker and wait until it has accepted (or refused) its init
    async fn start_child(
        &self,
        descriptor: &ChildDescriptor,
    ) -> std::result::Result<ProcessHandle, ChildError>;

    /// Stop a worker. Once this returns `Ok` the handle is neither alive nor listed.
    async fn terminate_child(&self, handle: &ProcessHandle)
    -> std::result::Result<(), ChildError>;

    /// Snapshot of the live children
    async fn list_children(&self) -> Vec<ChildInfo>;

    /// Whether `handle` names a live child of this supervisor
    async fn is_alive(&self, handle: &ProcessHandle) -> bool;
}

/// Opaque identifier of a live worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessHandle(Uuid);

impl ProcessHandle {
    /// Mint a handle no supervisor has ever issued
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProcessHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

/// Role of a supervised child
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildRole {
    Worker,
    Supervisor,
}

/// One entry of [`ChildSupervisor::list_children`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildInfo {
    pub handle: ProcessHandle,
    /// Identifier from the descriptor, if any
    pub id: Option<String>,
    pub role: ChildRole,
    /// Modules implementing the child
    pub modules: Vec<String>,
    pub started_at: DateTime<Utc>,
}
