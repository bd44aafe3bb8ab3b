//! Terminal reorder stage — the post-processing pattern.
//!
//! Completed envelopes are retained in an indexed buffer instead of being
//! forwarded. The buffer is keyed by a stage-local completion sequence
//! number: it numbers "the i-th envelope this stage instance has
//! completed", independent of envelope identity and of upstream arrival
//! order.

use crate::envelope::Envelope;
use crate::stage::{Process, StageContext, Worker, WorkerCore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// What a [`Reorder`] stage does with a completed envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReorderMode {
    /// Retain in the buffer only; the stage acts purely as a queryable
    /// completion store.
    #[default]
    Store,
    /// Retain a copy in the buffer and forward the original downstream,
    /// when an output boundary is bound.
    StoreAndForward,
}

/// Shared handle to a reorder stage's completion buffer.
///
/// The buffer is unbounded by the core: callers must retrieve or evict
/// entries if envelopes are not otherwise drained.
#[derive(Debug, Clone, Default)]
pub struct ReorderBuffer {
    entries: Arc<Mutex<HashMap<u64, Envelope>>>,
}

impl ReorderBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve a copy of the envelope completed at `seq`.
    pub fn get(&self, seq: u64) -> Option<Envelope> {
        self.entries.lock().get(&seq).cloned()
    }

    /// Remove and return the envelope completed at `seq`.
    pub fn take(&self, seq: u64) -> Option<Envelope> {
        self.entries.lock().remove(&seq)
    }

    pub fn contains(&self, seq: u64) -> bool {
        self.entries.lock().contains_key(&seq)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Sequence numbers currently present, in ascending order.
    pub fn sequence_numbers(&self) -> Vec<u64> {
        let mut seqs: Vec<u64> = self.entries.lock().keys().copied().collect();
        seqs.sort_unstable();
        seqs
    }

    /// Evict everything.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn insert(&self, seq: u64, envelope: Envelope) {
        self.entries.lock().insert(seq, envelope);
    }
}

/// Terminal stage retaining completed envelopes by completion order.
///
/// On `process` success the envelope is stored at the current sequence
/// counter value and the counter advances. On failure the counter does
/// *not* advance, so the numbering never has gaps: after `k` successes the
/// buffer holds exactly keys `0..k`.
pub struct Reorder<P: Process> {
    core: WorkerCore,
    process: P,
    mode: ReorderMode,
    buffer: ReorderBuffer,
    next_seq: AtomicU64,
}

impl<P: Process> Reorder<P> {
    pub fn new(name: impl Into<String>, process: P) -> Self {
        Self {
            core: WorkerCore::new(name),
            process,
            mode: ReorderMode::Store,
            buffer: ReorderBuffer::new(),
            next_seq: AtomicU64::new(0),
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

    /// Select between store-only and store-and-forward behavior.
    pub fn with_mode(mut self, mode: ReorderMode) -> Self {
        self.mode = mode;
        self
    }

    /// A cloneable handle to the completion buffer. Take one before
    /// handing the stage to the orchestrator.
    pub fn buffer(&self) -> ReorderBuffer {
        self.buffer.clone()
    }

    fn handle(&mut self, mut envelope: Envelope) -> bool {
        self.core.profiler_mut().start();
        if !self.core.run_process(&mut self.process, &mut envelope) {
            return false;
        }
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        match self.mode {
            ReorderMode::Store => self.buffer.insert(seq, envelope),
            ReorderMode::StoreAndForward => {
                self.buffer.insert(seq, envelope.clone());
                self.core.push_output(envelope);
            }
        }
        self.core.record_success();
        self.core.profiler_mut().stop();
        true
    }
}

impl<P: Process> Worker for Reorder<P> {
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
