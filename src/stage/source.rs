//! Source stage — generates envelopes at the head of the pipeline.

use crate::envelope::Envelope;
use crate::stage::{Process, StageContext, Worker, WorkerCore};
use std::time::Duration;

/// Default cap on the source's output queue length.
pub const DEFAULT_MAX_QUEUE_LEN: usize = 1024;

/// Default sleep interval while the output queue is full.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A stage with no input boundary. Each iteration constructs a fresh
/// envelope, lets `process` populate it from the external feed, and pushes
/// it downstream.
///
/// Backpressure is a polling policy, not a blocking one: while the output
/// queue holds `max_queue_len` or more envelopes, the source sleeps
/// `poll_interval` and retries. The length check is re-validated
/// immediately before every push, so the queue never exceeds the cap at
/// the instant of a push.
///
/// A `process` failure skips the push for that iteration — no partially
/// populated envelope is ever forwarded.
pub struct Source<P: Process> {
    core: WorkerCore,
    process: P,
    max_queue_len: usize,
    poll_interval: Duration,
    next_seq: u64,
}

impl<P: Process> Source<P> {
    pub fn new(name: impl Into<String>, process: P) -> Self {
        Self {
            core: WorkerCore::new(name),
            process,
            max_queue_len: DEFAULT_MAX_QUEUE_LEN,
            poll_interval: DEFAULT_POLL_INTERVAL,
            next_seq: 0,
        }
    }

    /// Pin this stage's thread to a CPU core.
    pub fn with_cpu_core(mut self, core: usize) -> Self {
        self.core.set_cpu_core(Some(core));
        self
    }

    /// Enable per-iteration latency profiling.
    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.core.set_profiling(enabled);
        self
    }

    /// Cap the output queue length.
    pub fn with_max_queue_len(mut self, max: usize) -> Self {
        self.max_queue_len = max;
        self
    }

    /// Sleep interval while the output queue is full.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn output_full(&self) -> bool {
        self.core
            .output()
            .map(|b| b.len() >= self.max_queue_len)
            .unwrap_or(false)
    }

    fn next_envelope(&mut self) -> Envelope {
        let envelope = Envelope::with_id(format!("{}-{}", self.core.name(), self.next_seq));
        self.next_seq += 1;
        envelope
    }
}

impl<P: Process> Worker for Source<P> {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn bind(&mut self, ctx: StageContext) {
        self.core.bind(ctx);
    }

    fn run(&mut self) {
        self.core.enter();

        while !self.core.should_exit() {
            if self.output_full() {
                std::thread::sleep(self.poll_interval);
                continue;
            }

            self.core.profiler_mut().start();
            let mut envelope = self.next_envelope();
            if !self.core.run_process(&mut self.process, &mut envelope) {
                continue;
            }

            // Re-validate the backpressure bound right before the push;
            // the earlier check may be stale by now.
            while self.output_full() && !self.core.should_exit() {
                std::thread::sleep(self.poll_interval);
            }
            if self.core.should_exit() {
                break;
            }

            self.core.push_output(envelope);
            self.core.record_success();
            self.core.profiler_mut().stop();
        }

        self.core.exited();
    }

    fn step(&mut self) -> bool {
        if self.output_full() {
            return false;
        }
        let mut envelope = self.next_envelope();
        if !self.core.run_process(&mut self.process, &mut envelope) {
            return false;
        }
        self.core.push_output(envelope);
        self.core.record_success();
        true
    }

    fn processed(&self) -> u64 {
        self.core.processed()
    }
}
