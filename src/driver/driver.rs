//! The workload driver: consumes events from the generator, advances the
//! simulation clock in ticks, and maps trace events onto live remote
//! sessions.
//!
//! Two threads per driver: the drive loop (event intake + tick issuance) and
//! the process loop (tick consumption + event dispatch). They synchronize
//! through the tick handshake, so no two ticks are ever processed
//! concurrently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info, warn};

use crate::event::{Event, EventKind, EventQueue};
use crate::kernel::{ExecuteRequest, KernelConnection, KernelSessionManager, ResourceSpec};
use crate::sim::{ClockTrigger, SimDuration, SimTime, SimulationClock, Ticker, sync_ticker};
use crate::workload::{
    EVENT_WORKLOAD_COMPLETE, EVENT_WORKLOAD_STARTED, GeneratorSignal, Workload, WorkloadEvent,
    WorkloadGenerator, WorkloadStateError,
};

use super::error::{DriverError, FatalError};
use super::session::{Session, SessionRegistry, internal_session_id, trace_session_id};

/// How often the process loop checks the control channel while waiting for
/// the next tick.
const CTRL_POLL_INTERVAL: Duration = Duration::from_millis(20);

static NEXT_DRIVER_SEQ: AtomicU64 = AtomicU64::new(0);

/// Unique (within this process and then some) driver id. The workload owned
/// by the driver shares this id.
fn generate_driver_id() -> String {
    let seq = NEXT_DRIVER_SEQ.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!("{seq:x}{nanos:08x}")
}

#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Simulated length of one tick.
    pub tick_duration: SimDuration,
    /// Wall-clock pacing relative to simulated time: 1.0 replays a 60s tick
    /// over 60s of wall time, 0.0 replays as fast as possible.
    pub timescale: f64,
    /// Upper bound on ticks served in a single run; `None` means unlimited.
    pub max_ticks_per_run: Option<u64>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            tick_duration: SimDuration::from_secs(60),
            timescale: 1.0,
            max_ticks_per_run: None,
        }
    }
}

/// Signals multiplexed into the process loop.
enum CtrlSignal {
    /// A per-event or provisioning failure; aborts the workload.
    Error(DriverError),
    /// External stop request.
    Stop,
    /// Generator done and queue drained.
    Complete,
}

/// Everything guarded by the single driver mutex.
struct DriverState {
    workload: Workload,
    registry: SessionRegistry,
}

/// Guard handed to the manager so cross-workload operations can hold several
/// drivers' locks in a fixed order.
pub struct DriverLock<'a> {
    guard: MutexGuard<'a, DriverState>,
}

impl DriverLock<'_> {
    pub fn workload(&self) -> &Workload {
        &self.guard.workload
    }
}

enum IssueTicksOutcome {
    /// The process loop is gone (stop or error); unwind quietly.
    TickerClosed,
    Failed(DriverError),
}

pub struct WorkloadDriver {
    id: String,
    config: DriverConfig,
    /// Upper bound of fully-resolved simulated time.
    current_tick: SimulationClock,
    /// Fractional position within the open tick.
    clock_time: SimulationClock,
    queue: EventQueue,
    kernel_manager: Arc<dyn KernelSessionManager>,
    generator: Arc<dyn WorkloadGenerator>,
    state: Mutex<DriverState>,
    ctrl_tx: Sender<CtrlSignal>,
    ctrl_rx: Mutex<Option<Receiver<CtrlSignal>>>,
    event_tx: Mutex<Option<Sender<GeneratorSignal>>>,
    event_rx: Mutex<Option<Receiver<GeneratorSignal>>>,
    ticks_handled: AtomicU64,
    handles: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl WorkloadDriver {
    pub fn new(
        workload_name: impl Into<String>,
        config: DriverConfig,
        generator: Arc<dyn WorkloadGenerator>,
        kernel_manager: Arc<dyn KernelSessionManager>,
    ) -> Arc<WorkloadDriver> {
        assert!(
            !config.tick_duration.is_zero(),
            "tick duration must be positive"
        );
        let id = generate_driver_id();
        let (ctrl_tx, ctrl_rx) = channel();
        let (event_tx, event_rx) = channel();
        Arc::new(WorkloadDriver {
            state: Mutex::new(DriverState {
                workload: Workload::new(id.clone(), workload_name),
                registry: SessionRegistry::new(),
            }),
            id,
            config,
            current_tick: SimulationClock::new(),
            clock_time: SimulationClock::new(),
            queue: EventQueue::new(),
            kernel_manager,
            generator,
            ctrl_tx,
            ctrl_rx: Mutex::new(Some(ctrl_rx)),
            event_tx: Mutex::new(Some(event_tx)),
            event_rx: Mutex::new(Some(event_rx)),
            ticks_handled: AtomicU64::new(0),
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Unique id of this driver (and of the workload it owns).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Snapshot of the owned workload.
    pub fn workload(&self) -> Workload {
        self.state.lock().expect("driver state lock").workload.clone()
    }

    /// Acquire this driver's lock. The manager uses this to hold several
    /// drivers in registration order while aggregating.
    pub fn lock(&self) -> DriverLock<'_> {
        DriverLock {
            guard: self.state.lock().expect("driver state lock"),
        }
    }

    /// Whether the given trace session is currently in the seen set.
    pub fn has_seen_session(&self, trace_session_id: &str) -> bool {
        let state = self.state.lock().expect("driver state lock");
        state
            .registry
            .has_seen(&internal_session_id(trace_session_id, &self.id))
    }

    /// Start the workload: `Ready -> Running`, then spawn the generator,
    /// drive and process threads.
    pub fn start(self: &Arc<Self>) -> Result<(), WorkloadStateError> {
        {
            let mut state = self.state.lock().expect("driver state lock");
            state.workload.start()?;
        }

        let event_tx = self
            .event_tx
            .lock()
            .expect("driver channel lock")
            .take()
            .expect("driver started twice");
        let event_rx = self
            .event_rx
            .lock()
            .expect("driver channel lock")
            .take()
            .expect("driver started twice");
        let ctrl_rx = self
            .ctrl_rx
            .lock()
            .expect("driver channel lock")
            .take()
            .expect("driver started twice");

        let (trigger, ticker) = sync_ticker(self.id.clone());

        let generator = Arc::clone(&self.generator);
        let generator_handle = thread::Builder::new()
            .name(format!("{}-generator", self.id))
            .spawn(move || generator.generate(event_tx))
            .expect("spawn generator thread");

        let driver = Arc::clone(self);
        let drive_handle = thread::Builder::new()
            .name(format!("{}-drive", self.id))
            .spawn(move || driver.drive_workload(event_rx, trigger))
            .expect("spawn drive thread");

        let driver = Arc::clone(self);
        let process_handle = thread::Builder::new()
            .name(format!("{}-process", self.id))
            .spawn(move || driver.process_workload(ctrl_rx, ticker))
            .expect("spawn process thread");

        self.handles
            .lock()
            .expect("driver handle lock")
            .extend([generator_handle, drive_handle, process_handle]);

        info!(workload_id = %self.id, "workload driver started");
        Ok(())
    }

    /// Stop a running workload before completion: `Running -> TerminatedEarly`.
    pub fn stop_workload(&self) -> Result<(), WorkloadStateError> {
        let mut state = self.state.lock().expect("driver state lock");
        if !state.workload.is_running() {
            return Err(WorkloadStateError::NotRunning);
        }
        let _ = self.ctrl_tx.send(CtrlSignal::Stop);
        state.workload.terminate_early(self.clock_time.time())?;
        info!(workload_id = %self.id, "workload instructed to terminate early");
        Ok(())
    }

    /// Block until all of this driver's threads have unwound.
    pub fn join(&self) {
        let handles: Vec<_> = self
            .handles
            .lock()
            .expect("driver handle lock")
            .drain(..)
            .collect();
        for handle in handles {
            let _ = handle.join();
        }
    }

    fn workload_is_running(&self) -> bool {
        self.state
            .lock()
            .expect("driver state lock")
            .workload
            .is_running()
    }

    // ---- drive loop: event intake and tick issuance ----

    fn drive_workload(&self, event_rx: Receiver<GeneratorSignal>, trigger: ClockTrigger) {
        info!(workload_id = %self.id, "bootstrapping simulation");
        let first = match event_rx.recv() {
            Ok(GeneratorSignal::Event(evt)) => evt,
            Ok(GeneratorSignal::Done) | Err(_) => {
                self.handle_critical_error(DriverError::NoFirstEvent);
                return;
            }
        };
        if let Err(err) = self.bootstrap(first) {
            self.handle_critical_error(err);
            return;
        }

        let mut next_tick = self.current_tick.time() + self.config.tick_duration;
        debug!(workload_id = %self.id, next_tick = ?next_tick, "simulation started");

        loop {
            match event_rx.recv() {
                Ok(GeneratorSignal::Event(evt)) => {
                    if evt.timestamp < next_tick {
                        // Occurs within the open tick; no clock movement needed.
                        self.queue.enqueue_event(evt);
                        continue;
                    }
                    // The event lies beyond the next tick boundary: catch the
                    // clock up to it first, then enqueue.
                    match self.issue_clock_ticks(evt.timestamp, &trigger) {
                        Ok(()) => {
                            next_tick = self.current_tick.time() + self.config.tick_duration;
                            debug!(workload_id = %self.id, next_tick = ?next_tick, "advanced tick boundary");
                            self.queue.enqueue_event(evt);
                        }
                        Err(IssueTicksOutcome::TickerClosed) => {
                            debug!(workload_id = %self.id, "process loop gone; drive loop exiting");
                            return;
                        }
                        Err(IssueTicksOutcome::Failed(err)) => {
                            self.handle_critical_error(err);
                            return;
                        }
                    }
                }
                Ok(GeneratorSignal::Done) | Err(_) => {
                    debug!(
                        workload_id = %self.id,
                        backlog = self.queue.len(),
                        "generator finished; draining remaining events"
                    );
                    while self.queue.len() > 0 {
                        match self.issue_clock_ticks(next_tick, &trigger) {
                            Ok(()) => {
                                next_tick = self.current_tick.time() + self.config.tick_duration;
                            }
                            Err(IssueTicksOutcome::TickerClosed) => {
                                debug!(workload_id = %self.id, "process loop gone; drive loop exiting");
                                return;
                            }
                            Err(IssueTicksOutcome::Failed(err)) => {
                                self.handle_critical_error(err);
                                return;
                            }
                        }
                    }
                    let _ = self.ctrl_tx.send(CtrlSignal::Complete);
                    return;
                }
            }
        }
    }

    fn bootstrap(&self, first: Event) -> Result<(), DriverError> {
        info!(
            workload_id = %self.id,
            event_id = %first.id,
            timestamp = ?first.timestamp,
            "received first event; seeding clocks"
        );
        self.current_tick
            .increase_clock_time_to(first.timestamp)
            .map_err(FatalError::from)?;
        self.clock_time
            .increase_clock_time_to(first.timestamp)
            .map_err(FatalError::from)?;
        self.queue.enqueue_event(first);
        Ok(())
    }

    /// Issue clock ticks until `current_tick` has caught up to `target`.
    /// Exactly `floor((target - current) / tick_duration)` ticks are issued;
    /// anything else is an internal-consistency violation.
    fn issue_clock_ticks(
        &self,
        target: SimTime,
        trigger: &ClockTrigger,
    ) -> Result<(), IssueTicksOutcome> {
        let tick_duration = self.config.tick_duration;
        let mut current = self.current_tick.time();
        let expected = (target - current) / tick_duration;

        match self.queue.next_event_timestamp() {
            Some(next_at) => debug!(
                workload_id = %self.id,
                expected,
                next_event_at = ?next_at,
                "issuing clock ticks"
            ),
            None => debug!(workload_id = %self.id, expected, "issuing clock ticks; queue empty"),
        }

        let wall_budget = tick_duration.to_std();
        let mut issued: u64 = 0;
        while current + tick_duration <= target {
            let tick_start = Instant::now();
            let tick = self.current_tick.increment_clock_by(tick_duration);
            debug!(
                workload_id = %self.id,
                tick = ?tick,
                backlog = self.queue.len(),
                "issuing tick"
            );

            trigger
                .trigger(tick)
                .map_err(|_| IssueTicksOutcome::TickerClosed)?;
            issued += 1;
            current = self.current_tick.time();

            // Pace wall-clock time against simulated time. A negative budget
            // means the tick took longer to process than it simulates, which
            // the driver surfaces rather than absorbs.
            let elapsed = tick_start.elapsed();
            let remaining_secs =
                self.config.timescale * (wall_budget.as_secs_f64() - elapsed.as_secs_f64());
            if remaining_secs < 0.0 {
                return Err(IssueTicksOutcome::Failed(
                    FatalError::TickOverrun {
                        tick,
                        elapsed,
                        budget: wall_budget,
                    }
                    .into(),
                ));
            }
            if remaining_secs > 0.0 {
                thread::sleep(Duration::from_secs_f64(remaining_secs));
            }
        }

        if issued != expected {
            return Err(IssueTicksOutcome::Failed(
                FatalError::TickCountMismatch { expected, issued }.into(),
            ));
        }
        Ok(())
    }

    // ---- process loop: tick consumption and event dispatch ----

    fn process_workload(&self, ctrl_rx: Receiver<CtrlSignal>, mut ticker: Ticker) {
        {
            let mut state = self.state.lock().expect("driver state lock");
            let sim_now = self.clock_time.time();
            state.workload.processed_event(WorkloadEvent::new(
                format!("{}-started", self.id),
                EVENT_WORKLOAD_STARTED,
                "-",
                sim_now,
                None,
            ));
        }
        info!(workload_id = %self.id, "processing loop running");

        let mut ticks_served: u64 = 0;
        loop {
            // Stop and error signals preempt the next tick.
            loop {
                match ctrl_rx.try_recv() {
                    Ok(signal) => {
                        if self.handle_ctrl_signal(signal) {
                            return;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return,
                }
            }

            if !self.workload_is_running() {
                return;
            }

            match ticker.recv_timeout(CTRL_POLL_INTERVAL) {
                Ok(Some(tick)) => {
                    debug!(workload_id = %self.id, tick = ?tick, "received tick");
                    if let Err(err) = self.handle_tick(tick, &mut ticker) {
                        self.handle_critical_error(err);
                        return;
                    }
                    ticks_served += 1;
                    if let Some(budget) = self.config.max_ticks_per_run {
                        if ticks_served > budget {
                            self.handle_critical_error(
                                FatalError::TickBudgetExhausted(budget).into(),
                            );
                            return;
                        }
                    }
                }
                Ok(None) => continue,
                Err(_) => {
                    // Drive loop is gone; a final Complete (or Stop/Error)
                    // may still be queued on the control channel.
                    if let Ok(signal) = ctrl_rx.recv_timeout(CTRL_POLL_INTERVAL) {
                        self.handle_ctrl_signal(signal);
                    }
                    return;
                }
            }
        }
    }

    /// Returns true when the signal ends the process loop.
    fn handle_ctrl_signal(&self, signal: CtrlSignal) -> bool {
        match signal {
            CtrlSignal::Error(err) => {
                error!(workload_id = %self.id, error = %err, "received error signal");
                self.handle_critical_error(err);
                true
            }
            CtrlSignal::Stop => {
                info!(workload_id = %self.id, "workload instructed to terminate early");
                self.abort_workload();
                true
            }
            CtrlSignal::Complete => {
                self.workload_complete();
                true
            }
        }
    }

    fn handle_tick(&self, tick: SimTime, ticker: &mut Ticker) -> Result<(), DriverError> {
        self.current_tick
            .increase_clock_time_to(tick)
            .map_err(FatalError::from)?;
        debug!(workload_id = %self.id, tick = ?tick, "serving tick");

        // Even when no events advanced the fractional clock this tick, keep
        // it in line with the simulation.
        let prev_tick_start = tick.saturating_back(self.config.tick_duration);
        if self.clock_time.time() < prev_tick_start {
            self.clock_time
                .increase_clock_time_to(prev_tick_start)
                .map_err(FatalError::from)?;
        }

        self.handle_session_start_events(tick)?;
        self.process_events_for_tick(tick)?;
        self.done_serving_tick(ticker);
        Ok(())
    }

    fn done_serving_tick(&self, ticker: &mut Ticker) {
        let ticks = self.ticks_handled.fetch_add(1, Ordering::SeqCst) + 1;
        let sim_now = self.clock_time.time();
        {
            let mut state = self.state.lock().expect("driver state lock");
            state.workload.tick_completed(ticks, sim_now);
        }
        debug!(
            workload_id = %self.id,
            ticks,
            backlog = self.queue.len(),
            "done serving tick"
        );
        ticker.done();
    }

    /// Drain and provision all session-start events up to `tick`, serially:
    /// provisioning must precede any training event for the same session.
    fn handle_session_start_events(&self, tick: SimTime) -> Result<(), DriverError> {
        let mut provisioned = 0usize;
        while let Some(evt) = self.queue.get_next_session_start_event(tick) {
            let result = self.provision_session(&evt);
            {
                let mut state = self.state.lock().expect("driver state lock");
                state.workload.processed_event(WorkloadEvent::new(
                    evt.id.clone(),
                    evt.kind.as_str(),
                    evt.session_id.clone(),
                    evt.timestamp,
                    result.as_ref().err().map(|e| e.to_string()),
                ));
            }
            if let Err(err) = result {
                error!(
                    workload_id = %self.id,
                    session_id = %evt.session_id,
                    error = %err,
                    "failed to provision session; abandoning remaining provisioning"
                );
                return Err(err);
            }
            provisioned += 1;
        }
        if provisioned > 0 {
            debug!(workload_id = %self.id, provisioned, tick = ?tick, "provisioned sessions for tick");
        }
        Ok(())
    }

    /// Create the remote session (which implicitly creates its backing
    /// kernel) and the local session record.
    fn provision_session(&self, evt: &Event) -> Result<(), DriverError> {
        let trace_id = evt.session_id.as_str();
        let internal_id = internal_session_id(trace_id, &self.id);

        // Guard against duplicate trace events before touching the cluster.
        {
            let state = self.state.lock().expect("driver state lock");
            if state.registry.has_seen(&internal_id) {
                return Err(FatalError::DuplicateSession(internal_id).into());
            }
        }

        let request = &evt.meta.resource_request;
        let resource_spec = ResourceSpec {
            cpus: request.cpus,
            memory_mb: request.memory_mb,
            gpus: request.gpus,
        };

        debug!(
            workload_id = %self.id,
            session_id = %trace_id,
            internal_session_id = %internal_id,
            "creating remote session"
        );
        let provision_start = Instant::now();
        let connection = self.kernel_manager.create_session(
            trace_id,
            &format!("{trace_id}.ipynb"),
            "notebook",
            "distributed",
            &resource_spec,
        )?;
        debug!(
            workload_id = %self.id,
            session_id = %trace_id,
            elapsed = ?provision_start.elapsed(),
            "remote session created"
        );

        let session = Session {
            trace_id: trace_id.to_string(),
            internal_id,
            resource_request: request.clone(),
            created_at: evt.timestamp,
            training_active: false,
            gpu_utilization: None,
            stopped: false,
        };

        let mut state = self.state.lock().expect("driver state lock");
        state.registry.insert(session, connection)?;
        state.workload.session_created();
        Ok(())
    }

    /// Group the tick's remaining ready events by session and apply each
    /// session's events in order, sessions concurrently.
    fn process_events_for_tick(&self, tick: SimTime) -> Result<(), DriverError> {
        let mut session_events: HashMap<String, Vec<Event>> = HashMap::new();
        while let Some(evt) = self.queue.get_next_event(tick) {
            session_events
                .entry(evt.session_id.clone())
                .or_default()
                .push(evt);
        }
        if session_events.is_empty() {
            return Ok(());
        }

        debug!(
            workload_id = %self.id,
            num_sessions = session_events.len(),
            tick = ?tick,
            "dispatching events"
        );

        // One worker per session; the scope is the join barrier. A failing
        // session reports through the control channel and aborts the
        // workload, it never takes down the other sessions' workers.
        thread::scope(|scope| {
            for (session_id, events) in session_events {
                let ctrl_tx = self.ctrl_tx.clone();
                scope.spawn(move || self.process_events_for_session(&session_id, events, ctrl_tx));
            }
        });

        let mut state = self.state.lock().expect("driver state lock");
        state.workload.update_time_elapsed();
        Ok(())
    }

    fn process_events_for_session(
        &self,
        session_id: &str,
        events: Vec<Event>,
        ctrl_tx: Sender<CtrlSignal>,
    ) {
        let num_events = events.len();
        for (idx, evt) in events.into_iter().enumerate() {
            debug!(
                workload_id = %self.id,
                session_id,
                event = %evt.kind,
                progress = format!("{}/{num_events}", idx + 1),
                "handling event"
            );
            let result = self.handle_event(&evt);
            {
                let mut state = self.state.lock().expect("driver state lock");
                state.workload.processed_event(WorkloadEvent::new(
                    evt.id.clone(),
                    evt.kind.as_str(),
                    evt.session_id.clone(),
                    evt.timestamp,
                    result.as_ref().err().map(|e| e.to_string()),
                ));
            }
            if let Err(err) = result {
                error!(
                    workload_id = %self.id,
                    session_id,
                    event = %evt.kind,
                    error = %err,
                    "failed to handle event"
                );
                let _ = ctrl_tx.send(CtrlSignal::Error(err));
                return;
            }
        }
    }

    /// Closed dispatch over event kinds. Session-start events must have been
    /// routed through the provisioning sub-queue and never arrive here.
    fn handle_event(&self, evt: &Event) -> Result<(), DriverError> {
        let trace_id = evt.session_id.as_str();
        let internal_id = internal_session_id(trace_id, &self.id);

        match evt.kind {
            EventKind::SessionStarted => {
                Err(FatalError::MisroutedSessionStart(evt.id.clone()).into())
            }
            EventKind::TrainingStarted => {
                let kernel = self.kernel_connection_for(&internal_id, evt.kind)?;
                kernel.request_execute(&ExecuteRequest::training())?;
                let mut state = self.state.lock().expect("driver state lock");
                if let Some(session) = state.registry.session_mut(&internal_id) {
                    session.training_active = true;
                }
                state.workload.training_started();
                debug!(workload_id = %self.id, session_id = %trace_id, "training started");
                Ok(())
            }
            EventKind::TrainingEnded => {
                let kernel = self.kernel_connection_for(&internal_id, evt.kind)?;
                kernel.stop_running_training_code(true)?;
                let mut state = self.state.lock().expect("driver state lock");
                if let Some(session) = state.registry.session_mut(&internal_id) {
                    session.training_active = false;
                }
                state.workload.training_stopped();
                debug!(workload_id = %self.id, session_id = %trace_id, "training ended");
                Ok(())
            }
            EventKind::UpdateGpuUtil => {
                // Advisory: resource accounting only, no remote call.
                let mut state = self.state.lock().expect("driver state lock");
                if let Some(session) = state.registry.session_mut(&internal_id) {
                    session.gpu_utilization = evt.meta.gpu_utilization;
                }
                Ok(())
            }
            EventKind::SessionStopped => {
                // The seen entry is released only after the remote teardown
                // succeeded; on failure the session stays seen.
                self.kernel_manager
                    .stop_kernel(trace_session_id(&internal_id))?;
                let mut state = self.state.lock().expect("driver state lock");
                state.registry.mark_stopped(&internal_id);
                state.workload.session_stopped();
                debug!(workload_id = %self.id, session_id = %trace_id, "session stopped");
                Ok(())
            }
        }
    }

    /// The lookup chain for training events: seen session, live session
    /// connection, attached kernel connection. The lock is released before
    /// the caller performs the remote call.
    fn kernel_connection_for(
        &self,
        internal_id: &str,
        kind: EventKind,
    ) -> Result<Arc<dyn KernelConnection>, DriverError> {
        let state = self.state.lock().expect("driver state lock");
        if !state.registry.has_seen(internal_id) {
            return Err(DriverError::UnknownSession {
                kind: kind.as_str().to_string(),
                session_id: internal_id.to_string(),
            });
        }
        let connection =
            state
                .registry
                .connection(internal_id)
                .ok_or_else(|| DriverError::NoSessionConnection {
                    session_id: internal_id.to_string(),
                })?;
        connection
            .kernel()
            .ok_or_else(|| DriverError::NoKernelConnection {
                session_id: internal_id.to_string(),
            })
    }

    // ---- terminal transitions ----

    fn handle_critical_error(&self, err: DriverError) {
        error!(
            workload_id = %self.id,
            error = %err,
            "workload encountered a critical error and must abort"
        );
        self.abort_workload();
        let mut state = self.state.lock().expect("driver state lock");
        state.workload.update_time_elapsed();
        state.workload.set_erred(err.to_string());
    }

    /// Stop the generator and leave already-provisioned remote sessions
    /// running; tearing them down here could cascade failures during
    /// shutdown, so cleanup is a recorded follow-up instead.
    fn abort_workload(&self) {
        warn!(workload_id = %self.id, "aborting workload");
        self.generator.stop_generating();
        let live_sessions = {
            let state = self.state.lock().expect("driver state lock");
            state.registry.len()
        };
        if live_sessions > 0 {
            warn!(
                workload_id = %self.id,
                live_sessions,
                "leaving provisioned remote sessions running"
            );
        }
    }

    fn workload_complete(&self) {
        let sim_now = self.clock_time.time();
        let mut state = self.state.lock().expect("driver state lock");
        state.workload.set_completed();
        state.workload.processed_event(WorkloadEvent::new(
            format!("{}-complete", self.id),
            EVENT_WORKLOAD_COMPLETE,
            "-",
            sim_now,
            None,
        ));
        info!(
            workload_id = %self.id,
            ticks_handled = state.workload.ticks_handled,
            num_events_processed = state.workload.num_events_processed,
            num_sessions_created = state.workload.num_sessions_created,
            "workload complete"
        );
    }
}
