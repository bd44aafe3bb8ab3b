//! Sink stage — consumes envelopes at the tail of the pipeline.

use crate::stage::{Process, StageContext, Worker, WorkerCore};

/// A stage with an input boundary and no output.
///
/// Each iteration pops one envelope and runs the side-effecting `process`
/// (writing results out, publishing, etc.). The envelope is discarded
/// afterwards regardless of the outcome; failures are logged, never
/// retried.
pub struct Sink<P: Process> {
    core: WorkerCore,
    process: P,
}

impl<P: Process> Sink<P> {
    pub fn new(name: impl Into<String>, process: P) -> Self {
        Self {
            core: WorkerCore::new(name),
            process,
        }
    }

    /// Pin this stage's thread to a CPU core.
    pub fn with_cpu_core(mut self, core: usize) -> Self {
        self.core.set_cpu_core(Some(core));
        self
    }

    /// Enable per-item latency profiling.
    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.core.set_profiling(enabled);
        self
    }

    fn handle(&mut self, mut envelope: crate::envelope::Envelope) -> bool {
        self.core.profiler_mut().start();
        if !self.core.run_process(&mut self.process, &mut envelope) {
            return false;
        }
        self.core.record_success();
        self.core.profiler_mut().stop();
        true
        // The envelope drops here either way: it has left the pipeline.
    }
}

impl<P: Process> Worker for Sink<P> {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn bind(&mut self, ctx: StageContext) {
        self.core.bind(ctx);
    }

    fn run(&mut self) {
        self.core.enter();

        while !self.core.should_exit() {
            let Some(envelope) = self.core.pop_input() else {
                break;
            };
            self.handle(envelope);
        }

        self.core.exited();
    }

    fn step(&mut self) -> bool {
        match self.core.try_pop_input() {
            Some(envelope) => self.handle(envelope),
            None => false,
        }
    }

    fn processed(&self) -> u64 {
        self.core.processed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::Boundary;
    use crate::envelope::Envelope;
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_sink_consumes_all() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_inner = seen.clone();
        let mut sink = Sink::new("writer", move |env: &mut Envelope| {
            seen_inner.lock().unwrap().push(env.id().to_string());
            true
        });

        let input = Arc::new(Boundary::new());
        sink.bind(StageContext {
            input: Some(input.clone()),
            output: None,
            exit: Arc::new(AtomicBool::new(false)),
            events: None,
        });

        for i in 0..3 {
            input.push(Envelope::with_id(format!("e{i}")));
        }
        input.close();
        sink.run();

        assert_eq!(sink.processed(), 3);
        assert_eq!(*seen.lock().unwrap(), vec!["e0", "e1", "e2"]);
    }

    #[test]
    fn test_failure_still_discards() {
        let mut sink = Sink::new("writer", |_: &mut Envelope| false);
        let input = Arc::new(Boundary::new());
        sink.bind(StageContext {
            input: Some(input.clone()),
            output: None,
            exit: Arc::new(AtomicBool::new(false)),
            events: None,
        });

        input.push(Envelope::with_id("e0"));
        assert!(!sink.step());
        assert_eq!(sink.processed(), 0);
        // The envelope is gone regardless of the failure.
        assert!(input.is_empty());
    }
}
