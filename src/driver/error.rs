//! Error taxonomy of the workload driver.
//!
//! `DriverError` covers failures that are recoverable at the workload level:
//! the workload moves to `Erred`, other workloads keep running. `FatalError`
//! is the distinct kind for internal-consistency violations; it still aborts
//! only the offending workload, never the process.

use thiserror::Error;

use crate::kernel::KernelError;
use crate::sim::{ClockError, SimTime};

#[derive(Debug, Error, Clone)]
pub enum DriverError {
    #[error("received '{kind}' event for unknown session \"{session_id}\"")]
    UnknownSession { kind: String, session_id: String },

    #[error("no live session connection exists for session \"{session_id}\"")]
    NoSessionConnection { session_id: String },

    #[error("no kernel connection exists for session \"{session_id}\"")]
    NoKernelConnection { session_id: String },

    #[error("remote kernel call failed: {0}")]
    Kernel(#[from] KernelError),

    #[error("the generator completed without producing a first event")]
    NoFirstEvent,

    #[error(transparent)]
    Fatal(#[from] FatalError),
}

/// Programming-logic bugs, not operational failures. Fail loudly and abort
/// the workload rather than continue with corrupted state.
#[derive(Debug, Error, Clone)]
pub enum FatalError {
    #[error(transparent)]
    ClockOutOfOrder(#[from] ClockError),

    #[error("expected to issue {expected} clock tick(s); instead issued {issued}")]
    TickCountMismatch { expected: u64, issued: u64 },

    #[error("issuing tick at {tick:?} took {elapsed:?}, longer than the tick duration {budget:?}")]
    TickOverrun {
        tick: SimTime,
        elapsed: std::time::Duration,
        budget: std::time::Duration,
    },

    #[error("attempted to create already-seen session \"{0}\"")]
    DuplicateSession(String),

    #[error("session-start event \"{0}\" reached the per-session dispatch path")]
    MisroutedSessionStart(String),

    #[error("served more than the configured budget of {0} tick(s) in a single run")]
    TickBudgetExhausted(u64),
}
