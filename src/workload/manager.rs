//! Owns the collection of workload drivers and serializes cross-workload
//! operations.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, info};

use crate::driver::{DriverConfig, DriverLock, WorkloadDriver};
use crate::kernel::KernelSessionManager;

use super::generator::SpecGenerator;
use super::messages::WorkloadUpdate;
use super::spec::WorkloadSpec;
use super::workload::{Workload, WorkloadStateError};

#[derive(Debug, Error, Clone)]
pub enum ManagerError {
    #[error("no workload found with id \"{0}\"")]
    WorkloadNotFound(String),
    #[error(transparent)]
    Workload(#[from] WorkloadStateError),
}

#[derive(Default)]
struct ManagerInner {
    /// Registration order; cross-workload operations acquire driver locks in
    /// this order and release in reverse.
    order: Vec<String>,
    drivers: HashMap<String, Arc<WorkloadDriver>>,
    /// Registered since the last pushed update.
    unannounced: HashSet<String>,
    /// Terminal workloads already included in an update; their data no
    /// longer changes, so they are pushed exactly once more after ending.
    terminal_pushed: HashSet<String>,
}

#[derive(Default)]
pub struct WorkloadManager {
    inner: Mutex<ManagerInner>,
    next_message_seq: AtomicU64,
}

impl WorkloadManager {
    pub fn new() -> WorkloadManager {
        WorkloadManager::default()
    }

    /// Register a new workload: one fresh driver per workload.
    pub fn register_workload(
        &self,
        name: impl Into<String>,
        spec: WorkloadSpec,
        config: DriverConfig,
        kernel_manager: Arc<dyn KernelSessionManager>,
    ) -> Workload {
        let name = name.into();
        let label = spec.name.clone().unwrap_or_else(|| name.clone());
        let generator = Arc::new(SpecGenerator::new(label, spec));
        let driver = WorkloadDriver::new(name, config, generator, kernel_manager);
        let workload = driver.workload();

        let mut inner = self.inner.lock().expect("workload manager lock");
        inner.order.push(driver.id().to_string());
        inner.unannounced.insert(driver.id().to_string());
        inner.drivers.insert(driver.id().to_string(), driver);

        info!(workload_id = %workload.id, workload_name = %workload.name, "registered workload");
        workload
    }

    pub fn driver(&self, workload_id: &str) -> Option<Arc<WorkloadDriver>> {
        let inner = self.inner.lock().expect("workload manager lock");
        inner.drivers.get(workload_id).cloned()
    }

    fn driver_or_err(&self, workload_id: &str) -> Result<Arc<WorkloadDriver>, ManagerError> {
        self.driver(workload_id)
            .ok_or_else(|| ManagerError::WorkloadNotFound(workload_id.to_string()))
    }

    /// Start a registered workload. Single-workload operation: only that
    /// workload's driver is involved.
    pub fn start_workload(&self, workload_id: &str) -> Result<Workload, ManagerError> {
        let driver = self.driver_or_err(workload_id)?;
        driver.start()?;
        Ok(driver.workload())
    }

    /// Stop an actively-running workload before completion.
    pub fn stop_workload(&self, workload_id: &str) -> Result<Workload, ManagerError> {
        let driver = self.driver_or_err(workload_id)?;
        driver.stop_workload()?;
        Ok(driver.workload())
    }

    pub fn workload(&self, workload_id: &str) -> Option<Workload> {
        self.driver(workload_id).map(|d| d.workload())
    }

    /// Snapshot every registered workload without partial views: all driver
    /// locks are held together, acquired in registration order and released
    /// in reverse.
    pub fn workloads(&self) -> Vec<Workload> {
        let inner = self.inner.lock().expect("workload manager lock");
        let drivers: Vec<Arc<WorkloadDriver>> = inner
            .order
            .iter()
            .filter_map(|id| inner.drivers.get(id).cloned())
            .collect();

        let mut guards: Vec<DriverLock<'_>> = drivers.iter().map(|d| d.lock()).collect();
        let snapshots: Vec<Workload> = guards.iter().map(|g| g.workload().clone()).collect();
        while let Some(guard) = guards.pop() {
            drop(guard);
        }
        snapshots
    }

    /// Currently-running workloads only.
    pub fn active_workloads(&self) -> Vec<Workload> {
        self.workloads()
            .into_iter()
            .filter(|w| w.is_running())
            .collect()
    }

    /// Build the next update for subscribers: newly registered workloads,
    /// running workloads, and each terminal workload exactly once more.
    pub fn workload_update(&self) -> WorkloadUpdate {
        let message_id = format!("msg-{}", self.next_message_seq.fetch_add(1, Ordering::SeqCst));
        let mut update = WorkloadUpdate::new(message_id);

        let mut inner = self.inner.lock().expect("workload manager lock");
        let drivers: Vec<Arc<WorkloadDriver>> = inner
            .order
            .iter()
            .filter_map(|id| inner.drivers.get(id).cloned())
            .collect();

        let mut guards: Vec<DriverLock<'_>> = drivers.iter().map(|d| d.lock()).collect();
        for guard in &guards {
            let workload = guard.workload();
            if inner.unannounced.remove(&workload.id) {
                update.new_workloads.push(workload.clone());
            } else if workload.is_running() {
                update.modified_workloads.push(workload.clone());
            } else if workload.state.is_terminal()
                && inner.terminal_pushed.insert(workload.id.clone())
            {
                update.modified_workloads.push(workload.clone());
            }
        }
        while let Some(guard) = guards.pop() {
            drop(guard);
        }

        debug!(
            message_id = %update.message_id,
            new = update.new_workloads.len(),
            modified = update.modified_workloads.len(),
            "built workload update"
        );
        update
    }
}
