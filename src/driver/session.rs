//! Driver-local session records and the registry tracking them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::event::ResourceRequest;
use crate::kernel::SessionConnection;
use crate::sim::SimTime;

use super::error::FatalError;

/// Internal session id: trace id disambiguated by the driver id, so that
/// concurrent replays of the same trace never collide.
pub fn internal_session_id(trace_session_id: &str, driver_id: &str) -> String {
    format!("{trace_session_id}-{driver_id}")
}

/// Inverse of `internal_session_id`: strip the driver-id suffix.
pub fn trace_session_id(internal_session_id: &str) -> &str {
    match internal_session_id.rfind('-') {
        Some(idx) => &internal_session_id[..idx],
        None => internal_session_id,
    }
}

/// One replayed session, created on its session-start event.
#[derive(Debug, Clone)]
pub struct Session {
    pub trace_id: String,
    pub internal_id: String,
    pub resource_request: ResourceRequest,
    pub created_at: SimTime,
    pub training_active: bool,
    pub gpu_utilization: Option<f64>,
    pub stopped: bool,
}

/// Sessions, their live connections and the "seen" id set. Owned by the
/// driver and only touched under the driver mutex, so the registry itself
/// carries no lock.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
    connections: HashMap<String, Arc<dyn SessionConnection>>,
    seen: HashSet<String>,
}

impl SessionRegistry {
    pub fn new() -> SessionRegistry {
        SessionRegistry::default()
    }

    /// Register a freshly provisioned session. Re-creating a session whose
    /// internal id is already in the seen set is an invariant violation.
    pub fn insert(
        &mut self,
        session: Session,
        connection: Arc<dyn SessionConnection>,
    ) -> Result<(), FatalError> {
        if self.seen.contains(&session.internal_id) {
            return Err(FatalError::DuplicateSession(session.internal_id.clone()));
        }
        self.seen.insert(session.internal_id.clone());
        self.connections
            .insert(session.internal_id.clone(), connection);
        self.sessions.insert(session.internal_id.clone(), session);
        Ok(())
    }

    pub fn has_seen(&self, internal_id: &str) -> bool {
        self.seen.contains(internal_id)
    }

    pub fn connection(&self, internal_id: &str) -> Option<Arc<dyn SessionConnection>> {
        self.connections.get(internal_id).cloned()
    }

    pub fn session(&self, internal_id: &str) -> Option<&Session> {
        self.sessions.get(internal_id)
    }

    pub fn session_mut(&mut self, internal_id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(internal_id)
    }

    /// Mark a session permanently stopped and release its id from the seen
    /// set. Only called after the remote teardown succeeded.
    pub fn mark_stopped(&mut self, internal_id: &str) {
        self.seen.remove(internal_id);
        self.connections.remove(internal_id);
        if let Some(session) = self.sessions.get_mut(internal_id) {
            session.stopped = true;
            session.training_active = false;
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
