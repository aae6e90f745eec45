//! Chronologically ordered buffer of pending trace events.
//!
//! Session-start events live in their own sub-queue so that all provisioning
//! for a tick can be drained before any training event of that tick is
//! dispatched.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Mutex;

use tracing::debug;

use super::event::Event;
use crate::sim::SimTime;

struct QueuedEvent {
    at: SimTime,
    seq: u64,
    evt: Event,
}

// BinaryHeap is a max-heap; we want earliest-timestamp-first, so compare
// reversed. Ties break on insertion order.
impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.at.cmp(&other.at) {
            Ordering::Equal => self.seq.cmp(&other.seq),
            ord => ord,
        }
        .reverse()
    }
}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for QueuedEvent {}

#[derive(Default)]
struct QueueInner {
    next_seq: u64,
    main: BinaryHeap<QueuedEvent>,
    session_starts: BinaryHeap<QueuedEvent>,
}

impl QueueInner {
    fn push(&mut self, evt: Event) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        let queued = QueuedEvent {
            at: evt.timestamp,
            seq,
            evt,
        };
        if queued.evt.kind.is_session_start() {
            self.session_starts.push(queued);
        } else {
            self.main.push(queued);
        }
    }
}

/// Single-writer (generator thread) / single-reader (driver thread) event
/// buffer with its own interior lock; it never takes the driver mutex.
#[derive(Default)]
pub struct EventQueue {
    inner: Mutex<QueueInner>,
}

impl EventQueue {
    pub fn new() -> EventQueue {
        EventQueue::default()
    }

    /// Insert an event, preserving timestamp order.
    pub fn enqueue_event(&self, evt: Event) {
        let mut inner = self.inner.lock().expect("event queue lock");
        debug!(
            event_id = %evt.id,
            kind = %evt.kind,
            session_id = %evt.session_id,
            timestamp = ?evt.timestamp,
            backlog = inner.main.len() + inner.session_starts.len(),
            "enqueued event"
        );
        inner.push(evt);
    }

    /// True iff at least one non-session-start event has timestamp <= `tick`.
    pub fn has_events_for_tick(&self, tick: SimTime) -> bool {
        let inner = self.inner.lock().expect("event queue lock");
        inner.main.peek().is_some_and(|q| q.at <= tick)
    }

    /// Pop the globally earliest event with timestamp <= `tick`, ties broken
    /// by insertion order. Session-start events are never returned here.
    pub fn get_next_event(&self, tick: SimTime) -> Option<Event> {
        let mut inner = self.inner.lock().expect("event queue lock");
        if inner.main.peek().is_none_or(|q| q.at > tick) {
            return None;
        }
        let queued = inner.main.pop().expect("peek then pop");
        debug!(
            event_id = %queued.evt.id,
            kind = %queued.evt.kind,
            session_id = %queued.evt.session_id,
            backlog = inner.main.len(),
            "dequeued ready event"
        );
        Some(queued.evt)
    }

    /// Same contract as `get_next_event`, restricted to session-start events.
    /// Callers loop this to exhaustion before touching the main queue.
    pub fn get_next_session_start_event(&self, tick: SimTime) -> Option<Event> {
        let mut inner = self.inner.lock().expect("event queue lock");
        if inner.session_starts.peek().is_none_or(|q| q.at > tick) {
            return None;
        }
        Some(inner.session_starts.pop().expect("peek then pop").evt)
    }

    /// Timestamp of the earliest buffered non-session-start event.
    pub fn next_event_timestamp(&self) -> Option<SimTime> {
        let inner = self.inner.lock().expect("event queue lock");
        inner.main.peek().map(|q| q.at)
    }

    /// Total backlog across both sub-queues. Used to decide whether
    /// post-generation draining ticks are still required.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().expect("event queue lock");
        inner.main.len() + inner.session_starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
