//! Workload state machine, cumulative statistics and processing journal.
//!
//! A `Workload` is owned by exactly one driver; every mutation happens under
//! that driver's mutex.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::sim::SimTime;

/// Journal entries recorded for workload lifecycle transitions.
pub const EVENT_WORKLOAD_STARTED: &str = "workload-started";
pub const EVENT_WORKLOAD_COMPLETE: &str = "workload-complete";
pub const EVENT_WORKLOAD_TERMINATED: &str = "workload-terminated";

/// Long workloads process unbounded event streams; the journal keeps only the
/// most recent entries.
const MAX_JOURNAL_EVENTS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadState {
    /// Registered and ready to be started.
    Ready,
    /// Actively running.
    Running,
    /// Stopped naturally after processing all events.
    Finished,
    /// Stopped due to an unrecoverable error.
    Erred,
    /// Stopped because it was explicitly terminated before completion.
    TerminatedEarly,
}

impl WorkloadState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkloadState::Finished | WorkloadState::Erred | WorkloadState::TerminatedEarly
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkloadState::Ready => "ready",
            WorkloadState::Running => "running",
            WorkloadState::Finished => "finished",
            WorkloadState::Erred => "erred",
            WorkloadState::TerminatedEarly => "terminated-early",
        }
    }
}

impl std::fmt::Display for WorkloadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkloadStateError {
    #[error("cannot start workload in state \"{0}\"")]
    NotReady(WorkloadState),
    #[error("the workload is currently not running")]
    NotRunning,
}

/// One processed event, recorded even when processing failed.
#[derive(Debug, Clone, Serialize)]
pub struct WorkloadEvent {
    pub event_id: String,
    pub name: String,
    pub session_id: String,
    pub sim_timestamp_secs: u64,
    pub processed_at_unix_ms: u64,
    pub succeeded: bool,
    pub error: Option<String>,
}

impl WorkloadEvent {
    pub fn new(
        event_id: impl Into<String>,
        name: impl Into<String>,
        session_id: impl Into<String>,
        sim_timestamp: SimTime,
        error: Option<String>,
    ) -> WorkloadEvent {
        WorkloadEvent {
            event_id: event_id.into(),
            name: name.into(),
            session_id: session_id.into(),
            sim_timestamp_secs: sim_timestamp.as_secs(),
            processed_at_unix_ms: unix_millis_now(),
            succeeded: error.is_none(),
            error,
        }
    }
}

/// The workload owned and mutated by a single driver.
#[derive(Debug, Clone, Serialize)]
pub struct Workload {
    pub id: String,
    pub name: String,
    pub state: WorkloadState,
    pub error_message: Option<String>,
    pub ticks_handled: u64,
    pub num_events_processed: u64,
    pub num_sessions_created: u64,
    pub num_sessions_stopped: u64,
    pub num_training_started: u64,
    pub num_training_stopped: u64,
    pub current_sim_time_secs: u64,
    pub started_at_unix_ms: Option<u64>,
    pub finished_at_unix_ms: Option<u64>,
    pub time_elapsed_ms: u64,
    processed_events: VecDeque<WorkloadEvent>,
}

impl Workload {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Workload {
        Workload {
            id: id.into(),
            name: name.into(),
            state: WorkloadState::Ready,
            error_message: None,
            ticks_handled: 0,
            num_events_processed: 0,
            num_sessions_created: 0,
            num_sessions_stopped: 0,
            num_training_started: 0,
            num_training_stopped: 0,
            current_sim_time_secs: 0,
            started_at_unix_ms: None,
            finished_at_unix_ms: None,
            time_elapsed_ms: 0,
            processed_events: VecDeque::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == WorkloadState::Running
    }

    /// `Ready -> Running`; the only way a workload starts.
    pub fn start(&mut self) -> Result<(), WorkloadStateError> {
        if self.state != WorkloadState::Ready {
            return Err(WorkloadStateError::NotReady(self.state));
        }
        self.state = WorkloadState::Running;
        self.started_at_unix_ms = Some(unix_millis_now());
        Ok(())
    }

    /// `Running -> Finished`, once the generator is done and the queue drained.
    pub fn set_completed(&mut self) {
        if self.state != WorkloadState::Running {
            warn!(workload_id = %self.id, state = %self.state, "ignoring completion of non-running workload");
            return;
        }
        self.state = WorkloadState::Finished;
        self.finished_at_unix_ms = Some(unix_millis_now());
        self.update_time_elapsed();
    }

    /// `Running -> TerminatedEarly`, via external stop request.
    pub fn terminate_early(&mut self, sim_now: SimTime) -> Result<(), WorkloadStateError> {
        if self.state != WorkloadState::Running {
            return Err(WorkloadStateError::NotRunning);
        }
        self.state = WorkloadState::TerminatedEarly;
        self.finished_at_unix_ms = Some(unix_millis_now());
        self.processed_event(WorkloadEvent::new(
            format!("{}-terminated", self.id),
            EVENT_WORKLOAD_TERMINATED,
            "-",
            sim_now,
            None,
        ));
        self.update_time_elapsed();
        Ok(())
    }

    /// `Running -> Erred`. Terminal states are final, so a late error cannot
    /// overwrite an earlier termination.
    pub fn set_erred(&mut self, error_message: impl Into<String>) {
        let error_message = error_message.into();
        if self.state.is_terminal() {
            warn!(
                workload_id = %self.id,
                state = %self.state,
                error_message = %error_message,
                "workload already terminal; keeping original state"
            );
            return;
        }
        self.state = WorkloadState::Erred;
        self.error_message = Some(error_message);
        self.finished_at_unix_ms = Some(unix_millis_now());
        self.update_time_elapsed();
    }

    /// Record a processed event (successful or not) in the bounded journal.
    pub fn processed_event(&mut self, event: WorkloadEvent) {
        self.num_events_processed += 1;
        if self.processed_events.len() == MAX_JOURNAL_EVENTS {
            self.processed_events.pop_front();
        }
        self.processed_events.push_back(event);
    }

    pub fn processed_events(&self) -> impl Iterator<Item = &WorkloadEvent> {
        self.processed_events.iter()
    }

    pub fn session_created(&mut self) {
        self.num_sessions_created += 1;
    }

    pub fn session_stopped(&mut self) {
        self.num_sessions_stopped += 1;
    }

    pub fn training_started(&mut self) {
        self.num_training_started += 1;
    }

    pub fn training_stopped(&mut self) {
        self.num_training_stopped += 1;
    }

    pub fn tick_completed(&mut self, ticks_handled: u64, sim_now: SimTime) {
        self.ticks_handled = ticks_handled;
        self.current_sim_time_secs = sim_now.as_secs();
        self.update_time_elapsed();
    }

    pub fn update_time_elapsed(&mut self) {
        if let Some(started) = self.started_at_unix_ms {
            let until = self.finished_at_unix_ms.unwrap_or_else(unix_millis_now);
            self.time_elapsed_ms = until.saturating_sub(started);
        }
    }
}

fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
