//! Workload orchestration: the driver, its session registry and its errors.

mod driver;
mod error;
mod session;

pub use driver::{DriverConfig, DriverLock, WorkloadDriver};
pub use error::{DriverError, FatalError};
pub use session::{Session, SessionRegistry, internal_session_id, trace_session_id};
