//! Trace events and the chronological event queue.

mod event;
mod queue;

pub use event::{ANY_GPU, Event, EventKind, ResourceRequest, SessionMeta};
pub use queue::EventQueue;
