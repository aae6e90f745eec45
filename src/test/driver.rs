use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::driver::{DriverConfig, WorkloadDriver};
use crate::event::{Event, EventKind, SessionMeta};
use crate::kernel::DryRunKernelManager;
use crate::sim::{SimDuration, SimTime};
use crate::workload::{
    GeneratorSignal, SessionSpec, SpecGenerator, TrainingSpec, Workload, WorkloadGenerator,
    WorkloadSpec, WorkloadState,
};

/// Generator that replays a fixed, pre-built event list. Lets tests hand the
/// driver event sequences a well-formed spec could never produce.
struct StaticGenerator {
    events: Mutex<Vec<Event>>,
    stopped: AtomicBool,
}

impl StaticGenerator {
    fn new(events: Vec<Event>) -> StaticGenerator {
        StaticGenerator {
            events: Mutex::new(events),
            stopped: AtomicBool::new(false),
        }
    }
}

impl WorkloadGenerator for StaticGenerator {
    fn generate(&self, events: Sender<GeneratorSignal>) {
        let stream: Vec<Event> = self.events.lock().expect("static generator lock").drain(..).collect();
        for evt in stream {
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }
            if events.send(GeneratorSignal::Event(evt)).is_err() {
                break;
            }
        }
        let _ = events.send(GeneratorSignal::Done);
    }

    fn stop_generating(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

fn evt(id: &str, kind: EventKind, secs: u64, session: &str) -> Event {
    Event::new(
        id,
        kind,
        SimTime::from_secs(secs),
        session,
        SessionMeta::default(),
    )
}

fn fast_config() -> DriverConfig {
    DriverConfig {
        tick_duration: SimDuration::from_secs(60),
        timescale: 0.0,
        max_ticks_per_run: None,
    }
}

fn run_to_completion(
    generator: Arc<dyn WorkloadGenerator>,
    kernel_manager: Arc<DryRunKernelManager>,
    config: DriverConfig,
) -> (Workload, Arc<WorkloadDriver>) {
    let driver = WorkloadDriver::new("driver-test", config, generator, kernel_manager);
    driver.start().expect("start workload");
    driver.join();
    (driver.workload(), driver)
}

fn session_spec(id: &str, start_secs: u64) -> SessionSpec {
    SessionSpec {
        id: id.to_string(),
        start_secs,
        stop_secs: None,
        cpus: None,
        memory_mb: None,
        gpus: None,
        gpu_kind: None,
        trainings: vec![],
        gpu_util_updates: vec![],
    }
}

fn spec_of(sessions: Vec<SessionSpec>) -> WorkloadSpec {
    WorkloadSpec {
        schema_version: 1,
        name: None,
        tick_seconds: Some(60),
        timescale: None,
        sessions,
    }
}

#[test]
fn single_session_lifecycle_runs_to_completion() {
    let mut session = session_spec("s1", 0);
    session.stop_secs = Some(180);
    session.trainings = vec![TrainingSpec {
        start_secs: 60,
        end_secs: 120,
    }];
    let generator = Arc::new(SpecGenerator::new("lifecycle", spec_of(vec![session])));
    let kernel_manager = Arc::new(DryRunKernelManager::new());

    let (workload, driver) =
        run_to_completion(generator, Arc::clone(&kernel_manager), fast_config());

    assert_eq!(workload.state, WorkloadState::Finished);
    assert_eq!(workload.num_sessions_created, 1);
    assert_eq!(workload.num_sessions_stopped, 1);
    assert_eq!(workload.num_training_started, 1);
    assert_eq!(workload.num_training_stopped, 1);
    assert!(workload.error_message.is_none());

    assert_eq!(kernel_manager.sessions_created(), vec!["s1".to_string()]);
    assert_eq!(kernel_manager.kernels_stopped(), vec!["s1".to_string()]);
    assert_eq!(kernel_manager.executes(), 1);
    assert_eq!(kernel_manager.training_stops(), 1);

    // Every tick is event-driven, so the count is deterministic: ticks at
    // 60, 120, 180 and the draining tick at 240.
    assert_eq!(workload.ticks_handled, 4);

    // The stopped session was released from the seen set.
    assert!(!driver.has_seen_session("s1"));
}

#[test]
fn clock_catches_up_with_exactly_floor_delta_over_tick_ticks() {
    // First event at T0 = 0 seeds the clocks; the next event lands at
    // T0+125s with 60s ticks, which must issue exactly 2 catch-up ticks
    // (T0+60 and T0+120), never a third.
    let mut session = session_spec("s1", 0);
    session.trainings = vec![TrainingSpec {
        start_secs: 125,
        end_secs: 125,
    }];
    let generator = Arc::new(SpecGenerator::new("catch-up", spec_of(vec![session])));
    let kernel_manager = Arc::new(DryRunKernelManager::new());

    let (workload, _driver) =
        run_to_completion(generator, Arc::clone(&kernel_manager), fast_config());

    // A tick-count mismatch or overshoot would have erred the workload.
    assert_eq!(workload.state, WorkloadState::Finished);
    assert_eq!(kernel_manager.executes(), 1);
    assert_eq!(kernel_manager.training_stops(), 1);
    // Two catch-up ticks plus the draining tick at T0+180.
    assert_eq!(workload.ticks_handled, 3);
}

#[test]
fn training_event_for_unknown_session_errs_the_workload() {
    let events = vec![
        evt("e0", EventKind::SessionStarted, 0, "s1"),
        evt("e1", EventKind::TrainingStarted, 60, "ghost"),
    ];
    let generator = Arc::new(StaticGenerator::new(events));
    let kernel_manager = Arc::new(DryRunKernelManager::new());

    let (workload, driver) =
        run_to_completion(generator, Arc::clone(&kernel_manager), fast_config());

    // The driver loop survives; only the workload errs.
    assert_eq!(workload.state, WorkloadState::Erred);
    let message = workload.error_message.expect("error recorded");
    assert!(
        message.contains("unknown session"),
        "unexpected error: {message}"
    );
    // The known session was provisioned before the ghost event arrived.
    assert_eq!(kernel_manager.sessions_created(), vec!["s1".to_string()]);
    assert!(driver.has_seen_session("s1"));
}

#[test]
fn duplicate_session_start_is_fatal_to_the_workload() {
    let events = vec![
        evt("e0", EventKind::SessionStarted, 0, "s1"),
        evt("e1", EventKind::SessionStarted, 60, "s1"),
    ];
    let generator = Arc::new(StaticGenerator::new(events));
    let kernel_manager = Arc::new(DryRunKernelManager::new());

    let (workload, _driver) =
        run_to_completion(generator, Arc::clone(&kernel_manager), fast_config());

    assert_eq!(workload.state, WorkloadState::Erred);
    let message = workload.error_message.expect("error recorded");
    assert!(
        message.contains("already-seen session"),
        "unexpected error: {message}"
    );
    // Only the first provisioning reached the cluster.
    assert_eq!(kernel_manager.sessions_created(), vec!["s1".to_string()]);
}

#[test]
fn sessions_in_the_same_tick_dispatch_concurrently_and_both_complete() {
    let mut s1 = session_spec("s1", 0);
    s1.trainings = vec![TrainingSpec {
        start_secs: 60,
        end_secs: 120,
    }];
    let mut s2 = session_spec("s2", 0);
    s2.trainings = vec![TrainingSpec {
        start_secs: 60,
        end_secs: 120,
    }];
    let generator = Arc::new(SpecGenerator::new("concurrent", spec_of(vec![s1, s2])));
    let kernel_manager = Arc::new(DryRunKernelManager::new());

    let (workload, _driver) =
        run_to_completion(generator, Arc::clone(&kernel_manager), fast_config());

    assert_eq!(workload.state, WorkloadState::Finished);
    assert_eq!(workload.num_sessions_created, 2);
    // Both training starts (and both stops) completed before their ticks
    // were acknowledged.
    assert_eq!(kernel_manager.executes(), 2);
    assert_eq!(kernel_manager.training_stops(), 2);
    assert_eq!(workload.num_training_started, 2);
    assert_eq!(workload.num_training_stopped, 2);
}

#[test]
fn stop_kernel_failure_errs_the_workload_and_keeps_the_session_seen() {
    let mut session = session_spec("s1", 0);
    session.stop_secs = Some(60);
    let generator = Arc::new(SpecGenerator::new("stop-failure", spec_of(vec![session])));
    let kernel_manager = Arc::new(DryRunKernelManager::new());
    kernel_manager.fail_stop_kernel("s1");

    let (workload, driver) =
        run_to_completion(generator, Arc::clone(&kernel_manager), fast_config());

    assert_eq!(workload.state, WorkloadState::Erred);
    let message = workload.error_message.expect("error recorded");
    assert!(
        message.contains("injected stop failure"),
        "unexpected error: {message}"
    );
    // The teardown failed, so the session was not released.
    assert!(driver.has_seen_session("s1"));
    assert_eq!(workload.num_sessions_stopped, 0);
}

#[test]
fn provisioning_failure_abandons_the_workload() {
    let mut session = session_spec("s1", 0);
    session.trainings = vec![TrainingSpec {
        start_secs: 60,
        end_secs: 120,
    }];
    let generator = Arc::new(SpecGenerator::new("provision-failure", spec_of(vec![session])));
    let kernel_manager = Arc::new(DryRunKernelManager::new());
    kernel_manager.fail_create_session("s1");

    let (workload, driver) =
        run_to_completion(generator, Arc::clone(&kernel_manager), fast_config());

    assert_eq!(workload.state, WorkloadState::Erred);
    let message = workload.error_message.expect("error recorded");
    assert!(
        message.contains("injected create failure"),
        "unexpected error: {message}"
    );
    // Provisioning never succeeded, so no training call was attempted and
    // the session is not in the seen set.
    assert_eq!(kernel_manager.executes(), 0);
    assert!(!driver.has_seen_session("s1"));

    // The failed provisioning is journaled as processed-with-failure.
    let journaled = driver.workload();
    assert!(journaled.processed_events().any(|e| {
        e.name == "session-started" && !e.succeeded
    }));
}

#[test]
fn stop_request_terminates_the_workload_early() {
    // Pace the replay so there is something left to stop: 1s ticks replayed
    // in real time.
    let mut session = session_spec("s1", 0);
    session.stop_secs = Some(30);
    let config = DriverConfig {
        tick_duration: SimDuration::from_secs(1),
        timescale: 1.0,
        max_ticks_per_run: None,
    };
    let generator = Arc::new(SpecGenerator::new("stop-early", spec_of(vec![session])));
    let kernel_manager = Arc::new(DryRunKernelManager::new());

    let driver = WorkloadDriver::new("stoppable", config, generator, kernel_manager);
    driver.start().expect("start workload");
    std::thread::sleep(Duration::from_millis(100));
    driver.stop_workload().expect("stop running workload");
    driver.join();

    let workload = driver.workload();
    assert_eq!(workload.state, WorkloadState::TerminatedEarly);
    assert!(workload.error_message.is_none());

    // A second stop is rejected: the workload is no longer running.
    assert!(driver.stop_workload().is_err());
}

#[test]
fn tick_budget_exhaustion_is_a_fatal_error() {
    let mut session = session_spec("s1", 0);
    session.stop_secs = Some(240);
    let config = DriverConfig {
        tick_duration: SimDuration::from_secs(60),
        timescale: 0.0,
        max_ticks_per_run: Some(2),
    };
    let generator = Arc::new(SpecGenerator::new("budget", spec_of(vec![session])));
    let kernel_manager = Arc::new(DryRunKernelManager::new());

    let (workload, _driver) = run_to_completion(generator, kernel_manager, config);

    assert_eq!(workload.state, WorkloadState::Erred);
    let message = workload.error_message.expect("error recorded");
    assert!(message.contains("budget of 2"), "unexpected error: {message}");
}

#[test]
fn empty_generator_fails_the_bootstrap() {
    let generator = Arc::new(StaticGenerator::new(vec![]));
    let kernel_manager = Arc::new(DryRunKernelManager::new());

    let (workload, _driver) = run_to_completion(generator, kernel_manager, fast_config());

    assert_eq!(workload.state, WorkloadState::Erred);
    let message = workload.error_message.expect("error recorded");
    assert!(
        message.contains("without producing a first event"),
        "unexpected error: {message}"
    );
}

#[test]
fn gpu_util_updates_are_advisory_and_never_touch_the_cluster() {
    let mut session = session_spec("s1", 0);
    session.trainings = vec![TrainingSpec {
        start_secs: 60,
        end_secs: 180,
    }];
    session.gpu_util_updates = vec![crate::workload::GpuUtilSpec {
        at_secs: 120,
        gpu_util: 87.5,
    }];
    let generator = Arc::new(SpecGenerator::new("gpu-util", spec_of(vec![session])));
    let kernel_manager = Arc::new(DryRunKernelManager::new());

    let (workload, _driver) =
        run_to_completion(generator, Arc::clone(&kernel_manager), fast_config());

    assert_eq!(workload.state, WorkloadState::Finished);
    // One execute for the training start; the util update makes no call.
    assert_eq!(kernel_manager.executes(), 1);
    let processed: Vec<String> = workload
        .processed_events()
        .map(|e| e.name.clone())
        .collect();
    assert!(processed.contains(&"update-gpu-util".to_string()));
}
