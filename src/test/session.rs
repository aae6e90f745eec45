use std::sync::Arc;

use crate::driver::{Session, SessionRegistry, internal_session_id, trace_session_id};
use crate::event::ResourceRequest;
use crate::kernel::{KernelConnection, SessionConnection};
use crate::sim::SimTime;

struct FakeConnection {
    session_id: String,
}

impl SessionConnection for FakeConnection {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn kernel(&self) -> Option<Arc<dyn KernelConnection>> {
        None
    }
}

fn session(trace_id: &str, driver_id: &str) -> Session {
    Session {
        trace_id: trace_id.to_string(),
        internal_id: internal_session_id(trace_id, driver_id),
        resource_request: ResourceRequest::default(),
        created_at: SimTime::ZERO,
        training_active: false,
        gpu_utilization: None,
        stopped: false,
    }
}

fn connection(trace_id: &str) -> Arc<dyn SessionConnection> {
    Arc::new(FakeConnection {
        session_id: trace_id.to_string(),
    })
}

#[test]
fn internal_session_ids_round_trip() {
    let internal = internal_session_id("notebook-7", "abc123");
    assert_eq!(internal, "notebook-7-abc123");
    // The trace id may itself contain dashes; only the driver suffix is
    // stripped.
    assert_eq!(trace_session_id(&internal), "notebook-7");
    assert_eq!(trace_session_id("plain"), "plain");
}

#[test]
fn registry_rejects_an_already_seen_session() {
    let mut registry = SessionRegistry::new();
    registry
        .insert(session("s1", "d1"), connection("s1"))
        .expect("first insert");
    assert!(registry.has_seen("s1-d1"));

    let err = registry
        .insert(session("s1", "d1"), connection("s1"))
        .expect_err("duplicate insert must fail");
    assert!(err.to_string().contains("already-seen session"));
}

#[test]
fn stopping_a_session_releases_its_seen_entry() {
    let mut registry = SessionRegistry::new();
    registry
        .insert(session("s1", "d1"), connection("s1"))
        .expect("insert");
    assert!(registry.connection("s1-d1").is_some());

    registry.mark_stopped("s1-d1");
    assert!(!registry.has_seen("s1-d1"));
    assert!(registry.connection("s1-d1").is_none());
    let stopped = registry.session("s1-d1").expect("record kept");
    assert!(stopped.stopped);

    // The id can be reused once the session was stopped cleanly.
    registry
        .insert(session("s1", "d1"), connection("s1"))
        .expect("reuse after stop");
}

#[test]
fn distinct_drivers_replaying_the_same_trace_do_not_collide() {
    let mut registry = SessionRegistry::new();
    registry
        .insert(session("s1", "d1"), connection("s1"))
        .expect("driver 1");
    registry
        .insert(session("s1", "d2"), connection("s1"))
        .expect("driver 2");
    assert_eq!(registry.len(), 2);
}
