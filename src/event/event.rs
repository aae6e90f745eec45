//! Trace event model consumed by the workload driver.

use serde::{Deserialize, Serialize};

use crate::sim::SimTime;

/// Placeholder GPU kind for resource requests that accept any device.
pub const ANY_GPU: &str = "ANY_GPU";

/// The closed set of event kinds a trace can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    SessionStarted,
    TrainingStarted,
    UpdateGpuUtil,
    TrainingEnded,
    SessionStopped,
}

impl EventKind {
    /// Session-start events go through the provisioning sub-queue and must
    /// never reach the per-session dispatch path.
    pub fn is_session_start(self) -> bool {
        matches!(self, EventKind::SessionStarted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::SessionStarted => "session-started",
            EventKind::TrainingStarted => "training-started",
            EventKind::UpdateGpuUtil => "update-gpu-util",
            EventKind::TrainingEnded => "training-ended",
            EventKind::SessionStopped => "session-stopped",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resources a session asks the cluster for when it is provisioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub cpus: f64,
    pub memory_mb: f64,
    pub gpus: u32,
    pub gpu_kind: String,
}

impl ResourceRequest {
    pub fn new(cpus: f64, memory_mb: f64, gpus: u32, gpu_kind: impl Into<String>) -> Self {
        ResourceRequest {
            cpus,
            memory_mb,
            gpus,
            gpu_kind: gpu_kind.into(),
        }
    }
}

impl Default for ResourceRequest {
    fn default() -> Self {
        ResourceRequest::new(1.0, 512.0, 0, ANY_GPU)
    }
}

/// Per-event session payload: the resource request carried by session-start
/// events, plus the advisory utilization delta carried by GPU-util updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionMeta {
    pub resource_request: ResourceRequest,
    pub gpu_utilization: Option<f64>,
}

/// An immutable trace event. Created by the generator, consumed exactly once
/// by the driver's event queue.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: String,
    pub kind: EventKind,
    pub timestamp: SimTime,
    pub session_id: String,
    pub meta: SessionMeta,
}

impl Event {
    pub fn new(
        id: impl Into<String>,
        kind: EventKind,
        timestamp: SimTime,
        session_id: impl Into<String>,
        meta: SessionMeta,
    ) -> Event {
        Event {
            id: id.into(),
            kind,
            timestamp,
            session_id: session_id.into(),
            meta,
        }
    }
}
