//! In-process stand-in for the remote kernel manager.
//!
//! Backs the binaries' offline mode and the tests: records every call it
//! receives and can be told to fail specific operations.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::manager::{
    ExecuteRequest, KernelConnection, KernelError, KernelSessionManager, ResourceSpec,
    SessionConnection,
};

#[derive(Default)]
struct FailureInjection {
    create_for: HashSet<String>,
    stop_kernel_for: HashSet<String>,
    execute_for: HashSet<String>,
    stop_training_for: HashSet<String>,
}

/// Kernel manager that provisions sessions in memory only.
#[derive(Default)]
pub struct DryRunKernelManager {
    sessions_created: Mutex<Vec<String>>,
    kernels_stopped: Mutex<Vec<String>>,
    // Shared with the connections the manager hands out.
    executes: Arc<AtomicU64>,
    training_stops: Arc<AtomicU64>,
    failures: Mutex<FailureInjection>,
}

impl DryRunKernelManager {
    pub fn new() -> DryRunKernelManager {
        DryRunKernelManager::default()
    }

    pub fn sessions_created(&self) -> Vec<String> {
        self.sessions_created.lock().expect("dry-run lock").clone()
    }

    pub fn kernels_stopped(&self) -> Vec<String> {
        self.kernels_stopped.lock().expect("dry-run lock").clone()
    }

    pub fn executes(&self) -> u64 {
        self.executes.load(Ordering::SeqCst)
    }

    pub fn training_stops(&self) -> u64 {
        self.training_stops.load(Ordering::SeqCst)
    }

    pub fn fail_create_session(&self, session_id: impl Into<String>) {
        let mut failures = self.failures.lock().expect("dry-run lock");
        failures.create_for.insert(session_id.into());
    }

    pub fn fail_stop_kernel(&self, session_id: impl Into<String>) {
        let mut failures = self.failures.lock().expect("dry-run lock");
        failures.stop_kernel_for.insert(session_id.into());
    }

    pub fn fail_execute(&self, session_id: impl Into<String>) {
        let mut failures = self.failures.lock().expect("dry-run lock");
        failures.execute_for.insert(session_id.into());
    }

    pub fn fail_stop_training(&self, session_id: impl Into<String>) {
        let mut failures = self.failures.lock().expect("dry-run lock");
        failures.stop_training_for.insert(session_id.into());
    }
}

impl KernelSessionManager for DryRunKernelManager {
    fn create_session(
        &self,
        session_id: &str,
        path: &str,
        session_type: &str,
        kernel_spec_name: &str,
        resource_spec: &ResourceSpec,
    ) -> Result<Arc<dyn SessionConnection>, KernelError> {
        debug!(
            session_id,
            path,
            session_type,
            kernel_spec_name,
            cpus = resource_spec.cpus,
            memory_mb = resource_spec.memory_mb,
            gpus = resource_spec.gpus,
            "dry-run create_session"
        );

        let fail_execute;
        let fail_stop_training;
        {
            let failures = self.failures.lock().expect("dry-run lock");
            if failures.create_for.contains(session_id) {
                return Err(KernelError::CreateSessionFailed {
                    session_id: session_id.to_string(),
                    reason: "injected create failure".to_string(),
                });
            }
            fail_execute = failures.execute_for.contains(session_id);
            fail_stop_training = failures.stop_training_for.contains(session_id);
        }

        self.sessions_created
            .lock()
            .expect("dry-run lock")
            .push(session_id.to_string());

        let kernel = Arc::new(DryRunKernel {
            kernel_id: format!("kernel-{session_id}"),
            fail_execute,
            fail_stop_training,
            executes: Arc::clone(&self.executes),
            training_stops: Arc::clone(&self.training_stops),
        });

        Ok(Arc::new(DryRunSession {
            session_id: session_id.to_string(),
            kernel: Some(kernel),
        }))
    }

    fn stop_kernel(&self, session_id: &str) -> Result<(), KernelError> {
        debug!(session_id, "dry-run stop_kernel");
        {
            let failures = self.failures.lock().expect("dry-run lock");
            if failures.stop_kernel_for.contains(session_id) {
                return Err(KernelError::StopKernelFailed {
                    session_id: session_id.to_string(),
                    reason: "injected stop failure".to_string(),
                });
            }
        }
        self.kernels_stopped
            .lock()
            .expect("dry-run lock")
            .push(session_id.to_string());
        Ok(())
    }
}

struct DryRunSession {
    session_id: String,
    kernel: Option<Arc<DryRunKernel>>,
}

impl SessionConnection for DryRunSession {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn kernel(&self) -> Option<Arc<dyn KernelConnection>> {
        self.kernel
            .clone()
            .map(|k| k as Arc<dyn KernelConnection>)
    }
}

struct DryRunKernel {
    kernel_id: String,
    fail_execute: bool,
    fail_stop_training: bool,
    executes: Arc<AtomicU64>,
    training_stops: Arc<AtomicU64>,
}

impl KernelConnection for DryRunKernel {
    fn kernel_id(&self) -> &str {
        &self.kernel_id
    }

    fn request_execute(&self, request: &ExecuteRequest) -> Result<(), KernelError> {
        if self.fail_execute {
            return Err(KernelError::ExecuteFailed {
                kernel_id: self.kernel_id.clone(),
                reason: "injected execute failure".to_string(),
            });
        }
        debug!(
            kernel_id = %self.kernel_id,
            code_len = request.code.len(),
            silent = request.silent,
            "dry-run request_execute"
        );
        self.executes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop_running_training_code(&self, wait_for_response: bool) -> Result<(), KernelError> {
        if self.fail_stop_training {
            return Err(KernelError::StopTrainingFailed {
                kernel_id: self.kernel_id.clone(),
                reason: "injected stop-training failure".to_string(),
            });
        }
        debug!(kernel_id = %self.kernel_id, wait_for_response, "dry-run stop training");
        self.training_stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
