//! Client-side contract for the remote session/kernel manager.
//!
//! The wire protocol is an external, fixed API; these traits capture only the
//! calls the workload driver makes against it. All calls are synchronous and
//! may block on network I/O.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

/// Code submitted to a kernel to simulate a training burst. The cell blocks
/// on a local TCP socket until the kernel is told to stop training.
pub const TRAINING_CODE: &str = r#"
# This is the code we run in a notebook cell to simulate training.
import socket, os
sock = socket.socket(socket.AF_INET, socket.SOCK_STREAM)

# Connect to the kernel's TCP socket.
sock.connect(("127.0.0.1", 5555))
print(f'Connected to local TCP server. Local addr: {sock.getsockname()}')

# Blocking call.
# When training ends, the kernel will be sent a notification.
# It will then send us a message, unblocking us here and allowing to finish the cell execution.
sock.recv(1024)

print("Received 'stop' notification. Done training.")

del sock
"#;

#[derive(Debug, Error, Clone)]
pub enum KernelError {
    #[error("failed to create session \"{session_id}\": {reason}")]
    CreateSessionFailed { session_id: String, reason: String },
    #[error("failed to stop kernel for session \"{session_id}\": {reason}")]
    StopKernelFailed { session_id: String, reason: String },
    #[error("execute request rejected by kernel \"{kernel_id}\": {reason}")]
    ExecuteFailed { kernel_id: String, reason: String },
    #[error("stop-training request rejected by kernel \"{kernel_id}\": {reason}")]
    StopTrainingFailed { kernel_id: String, reason: String },
}

/// Resources requested for the kernel backing a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceSpec {
    pub cpus: f64,
    pub memory_mb: f64,
    pub gpus: u32,
}

/// Parameters of a kernel "execute" call.
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub code: String,
    pub silent: bool,
    pub store_history: bool,
    pub user_expressions: HashMap<String, serde_json::Value>,
    pub allow_stdin: bool,
    pub stop_on_error: bool,
    pub wait_for_response: bool,
}

impl ExecuteRequest {
    /// The fixed request the driver issues when a training burst starts.
    pub fn training() -> ExecuteRequest {
        ExecuteRequest {
            code: TRAINING_CODE.to_string(),
            silent: false,
            store_history: true,
            user_expressions: HashMap::new(),
            allow_stdin: true,
            stop_on_error: false,
            wait_for_response: false,
        }
    }
}

/// Live connection to the compute kernel backing a session.
pub trait KernelConnection: Send + Sync {
    fn kernel_id(&self) -> &str;

    fn request_execute(&self, request: &ExecuteRequest) -> Result<(), KernelError>;

    /// Tell the kernel to unblock the in-flight training cell, optionally
    /// waiting for the acknowledgement.
    fn stop_running_training_code(&self, wait_for_response: bool) -> Result<(), KernelError>;
}

/// Live connection to a remote session. The kernel link can be absent if the
/// backing kernel died or never attached.
pub trait SessionConnection: Send + Sync {
    fn session_id(&self) -> &str;

    fn kernel(&self) -> Option<Arc<dyn KernelConnection>>;
}

/// Remote manager that creates sessions (implicitly creating their backing
/// kernels) and tears kernels down.
pub trait KernelSessionManager: Send + Sync {
    fn create_session(
        &self,
        session_id: &str,
        path: &str,
        session_type: &str,
        kernel_spec_name: &str,
        resource_spec: &ResourceSpec,
    ) -> Result<Arc<dyn SessionConnection>, KernelError>;

    fn stop_kernel(&self, session_id: &str) -> Result<(), KernelError>;
}
