//! Driver-side boundary of the remote session/kernel protocol.

mod dry_run;
mod manager;

pub use dry_run::DryRunKernelManager;
pub use manager::{
    ExecuteRequest, KernelConnection, KernelError, KernelSessionManager, ResourceSpec,
    SessionConnection, TRAINING_CODE,
};
