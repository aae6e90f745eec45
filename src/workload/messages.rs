//! Notification payloads pushed to subscribers.
//!
//! The core only produces these snapshots; delivery belongs to an external
//! transport.

use serde::Serialize;

use super::workload::Workload;

/// One batch of workload changes, keyed by a generated message id.
#[derive(Debug, Clone, Serialize)]
pub struct WorkloadUpdate {
    pub message_id: String,
    pub new_workloads: Vec<Workload>,
    pub modified_workloads: Vec<Workload>,
    pub deleted_workloads: Vec<String>,
}

impl WorkloadUpdate {
    pub fn new(message_id: impl Into<String>) -> WorkloadUpdate {
        WorkloadUpdate {
            message_id: message_id.into(),
            new_workloads: Vec::new(),
            modified_workloads: Vec::new(),
            deleted_workloads: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.new_workloads.is_empty()
            && self.modified_workloads.is_empty()
            && self.deleted_workloads.is_empty()
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
