//! Boundary between lifecycle operations and the child-supervision primitive
//!
//! Every reason the primitive gives is converted here, and only here, into a
//! [`SupervisorError`]: start failures become execution errors carrying the original reason
//! in their details, and unknown handles become not-found errors.

use crate::child::{ChildInfo, ChildSupervisor, ProcessHandle};
use crate::error::{ChildError, Details, Result, SupervisorError};
use crate::spec::ChildDescriptor;
use serde_json::Value;

/// Borrowed view over a [`ChildSupervisor`] speaking the lifecycle error taxonomy
pub struct SupervisorAdapter<'a> {
    supervisor: &'a dyn ChildSupervisor,
}

impl<'a> SupervisorAdapter<'a> {
    pub fn new(supervisor: &'a dyn ChildSupervisor) -> Self {
        Self { supervisor }
    }

    /// Submit a descriptor
    pub async fn start_child(&self, descriptor: &ChildDescriptor) -> Result<ProcessHandle> {
        self.supervisor
            .start_child(descriptor)
            .await
            .map_err(|reason| start_error(descriptor, reason))
    }

    /// Stop a child by handle
    pub async fn terminate_child(&self, handle: &ProcessHandle) -> Result<()> {
        self.supervisor
            .terminate_child(handle)
            .await
            .map_err(|reason| terminate_error(handle, reason))
    }

    /// Snapshot of live children
    pub async fn list_children(&self) -> Vec<ChildInfo> {
        self.supervisor.list_children().await
    }
}

fn start_error(descriptor: &ChildDescriptor, reason: ChildError) -> SupervisorError {
    let mut details = Details::new();
    details.insert("reason".to_string(), Value::from(reason.to_string()));
    details.insert("module".to_string(), Value::from(descriptor.module.clone()));
    details.insert(
        "function".to_string(),
        Value::from(descriptor.function.clone()),
    );
    if let Some(ref id) = descriptor.id {
        details.insert("id".to_string(), Value::from(id.clone()));
    }
    SupervisorError::execution("Failed to start child process", details)
}

fn terminate_error(handle: &ProcessHandle, reason: ChildError) -> SupervisorError {
    let mut details = Details::new();
    details.insert("handle".to_string(), Value::from(handle.as_uuid().to_string()));
    match reason {
        ChildError::NotFound => SupervisorError::not_found("Process not found", details),
        other => {
            details.insert("reason".to_string(), Value::from(other.to_string()));
            SupervisorError::execution("Failed to terminate child process", details)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::spec::{ProcessSpec, normalize};
    use crate::task::TaskSupervisor;
    use crate::worker::ModuleRegistry;
    use warden_core::config::SupervisorConfig;

    #[tokio::test]
    async fn test_start_failure_is_execution_error() {
        let supervisor = TaskSupervisor::new(ModuleRegistry::new(), SupervisorConfig::default());
        let adapter = SupervisorAdapter::new(&supervisor);

        let err = adapter
            .start_child(&normalize(&ProcessSpec::module("ghost")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionError);
        let details = err.details();
        assert_eq!(details["reason"], "invalid module: ghost");
        assert_eq!(details["module"], "ghost");
        assert_eq!(details["function"], "start_link");
    }

    #[tokio::test]
    async fn test_unknown_handle_is_not_found() {
        let supervisor = TaskSupervisor::new(ModuleRegistry::new(), SupervisorConfig::default());
        let adapter = SupervisorAdapter::new(&supervisor);

        let handle = ProcessHandle::new();
        let err = adapter.terminate_child(&handle).await.unwrap_err();
        assert!(err.is_not_found());
        // same rendering as the handle in a lifecycle payload
        assert_eq!(err.details()["handle"], serde_json::to_value(handle).unwrap());
    }
}
