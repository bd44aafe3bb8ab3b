//! Observability channel between stage workers and the orchestrator.
//!
//! Workers report lifecycle and per-item diagnostics through a bounded
//! crossbeam channel. The stream is observational only: a full or
//! disconnected channel never blocks or fails a worker, events are simply
//! dropped.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::time::Duration;

/// Event channel capacity. Diagnostics are low-rate (per stage lifecycle
/// plus per-item failures), so a small bound is plenty.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Diagnostics emitted by stage workers.
#[derive(Debug, Clone)]
pub enum StageEvent {
    /// A worker thread entered its run loop.
    Started { stage: String },

    /// A worker left its run loop.
    Exited { stage: String, processed: u64 },

    /// A stage's `process` reported a recoverable per-item failure.
    /// The item was skipped, the worker keeps running.
    ItemFailed { stage: String, envelope_id: String },

    /// Profiling summary, emitted on exit when profiling is enabled.
    Profile {
        stage: String,
        average: Duration,
        total: Duration,
        count: u64,
    },
}

/// Create the worker-side sender and orchestrator-side monitor pair.
pub fn event_channel() -> (Sender<StageEvent>, PipelineMonitor) {
    let (tx, rx) = bounded(EVENT_CHANNEL_CAPACITY);
    (tx, PipelineMonitor { event_rx: rx })
}

/// Orchestrator-side handle for draining stage diagnostics.
pub struct PipelineMonitor {
    event_rx: Receiver<StageEvent>,
}

impl PipelineMonitor {
    /// Drain all pending events.
    pub fn drain(&self) -> Vec<StageEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Try to receive a single event without blocking.
    pub fn try_recv(&self) -> Option<StageEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<StageEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_in_order() {
        let (tx, monitor) = event_channel();
        tx.send(StageEvent::Started {
            stage: "source".into(),
        })
        .unwrap();
        tx.send(StageEvent::Exited {
            stage: "source".into(),
            processed: 7,
        })
        .unwrap();

        let events = monitor.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], StageEvent::Started { .. }));
        assert!(matches!(events[1], StageEvent::Exited { processed: 7, .. }));
    }

    #[test]
    fn test_try_recv_empty() {
        let (_tx, monitor) = event_channel();
        assert!(monitor.try_recv().is_none());
    }
}
