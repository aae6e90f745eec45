//! Event generation from a workload spec.
//!
//! The generator is an external collaborator from the driver's point of view:
//! it delivers events in non-decreasing timestamp order over the driver's
//! event channel and signals completion exactly once. `SpecGenerator` is the
//! built-in trace-replay implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use tracing::{debug, info};

use super::spec::WorkloadSpec;
use crate::event::{Event, EventKind, ResourceRequest, SessionMeta};
use crate::sim::SimTime;

/// What the generator pushes down the driver's event channel.
pub enum GeneratorSignal {
    Event(Event),
    /// Sent exactly once, after the final event.
    Done,
}

/// Contract the driver consumes. `generate` runs on its own thread and blocks
/// until the stream is exhausted or the generator is told to stop.
pub trait WorkloadGenerator: Send + Sync {
    fn generate(&self, events: Sender<GeneratorSignal>);

    /// Cooperative cancellation: stop producing further events. The `Done`
    /// signal is still delivered so the driver can wind down.
    fn stop_generating(&self);
}

/// Replays a `WorkloadSpec` as a timestamp-ordered event stream.
pub struct SpecGenerator {
    label: String,
    spec: WorkloadSpec,
    stopped: AtomicBool,
}

impl SpecGenerator {
    pub fn new(label: impl Into<String>, spec: WorkloadSpec) -> SpecGenerator {
        SpecGenerator {
            label: label.into(),
            spec,
            stopped: AtomicBool::new(false),
        }
    }

    /// Synthesize the full event list, ordered by timestamp with spec order
    /// breaking ties.
    fn synthesize(&self) -> Vec<Event> {
        let mut events = Vec::new();
        for session in &self.spec.sessions {
            let request = ResourceRequest {
                cpus: session.cpus.unwrap_or(1.0),
                memory_mb: session.memory_mb.unwrap_or(512.0),
                gpus: session.gpus.unwrap_or(0),
                gpu_kind: session
                    .gpu_kind
                    .clone()
                    .unwrap_or_else(|| crate::event::ANY_GPU.to_string()),
            };
            let meta = SessionMeta {
                resource_request: request,
                gpu_utilization: None,
            };

            events.push((
                SimTime::from_secs(session.start_secs),
                EventKind::SessionStarted,
                session.id.clone(),
                meta.clone(),
            ));
            for training in &session.trainings {
                events.push((
                    SimTime::from_secs(training.start_secs),
                    EventKind::TrainingStarted,
                    session.id.clone(),
                    meta.clone(),
                ));
                events.push((
                    SimTime::from_secs(training.end_secs),
                    EventKind::TrainingEnded,
                    session.id.clone(),
                    meta.clone(),
                ));
            }
            for update in &session.gpu_util_updates {
                let mut update_meta = meta.clone();
                update_meta.gpu_utilization = Some(update.gpu_util);
                events.push((
                    SimTime::from_secs(update.at_secs),
                    EventKind::UpdateGpuUtil,
                    session.id.clone(),
                    update_meta,
                ));
            }
            if let Some(stop_secs) = session.stop_secs {
                events.push((
                    SimTime::from_secs(stop_secs),
                    EventKind::SessionStopped,
                    session.id.clone(),
                    meta,
                ));
            }
        }

        // Stable by construction order, so equal timestamps keep spec order.
        events.sort_by_key(|(at, _, _, _)| *at);

        events
            .into_iter()
            .enumerate()
            .map(|(seq, (at, kind, session_id, meta))| {
                Event::new(
                    format!("{}-evt-{seq}", self.label),
                    kind,
                    at,
                    session_id,
                    meta,
                )
            })
            .collect()
    }
}

impl WorkloadGenerator for SpecGenerator {
    fn generate(&self, events: Sender<GeneratorSignal>) {
        let stream = self.synthesize();
        info!(
            generator = %self.label,
            num_events = stream.len(),
            "generator starting event replay"
        );

        let mut delivered = 0usize;
        for evt in stream {
            if self.stopped.load(Ordering::SeqCst) {
                debug!(generator = %self.label, delivered, "generator stopped early");
                break;
            }
            if events.send(GeneratorSignal::Event(evt)).is_err() {
                // Driver went away; nothing left to deliver to.
                break;
            }
            delivered += 1;
        }

        let _ = events.send(GeneratorSignal::Done);
        info!(generator = %self.label, delivered, "generator finished");
    }

    fn stop_generating(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}
