//! Workloads: state machine, trace specs, event generation, the manager and
//! the notification payloads it produces.

mod generator;
mod manager;
mod messages;
mod spec;
mod workload;

pub use generator::{GeneratorSignal, SpecGenerator, WorkloadGenerator};
pub use manager::{ManagerError, WorkloadManager};
pub use messages::WorkloadUpdate;
pub use spec::{GpuUtilSpec, SessionSpec, TrainingSpec, WorkloadSpec};
pub use workload::{
    EVENT_WORKLOAD_COMPLETE, EVENT_WORKLOAD_STARTED, EVENT_WORKLOAD_TERMINATED, Workload,
    WorkloadEvent, WorkloadState, WorkloadStateError,
};
