//! Stage workers — the generic unit of execution.
//!
//! A stage is an otherwise fixed loop customized by a single capability:
//! [`Process`], supplied by the application as a trait impl or a plain
//! closure. The core schedules and queues around that opaque step and
//! never inspects envelope payloads.
//!
//! Four specializations cover the pipeline shapes:
//!
//! - [`Source`] — no input boundary; generates envelopes under a polling
//!   backpressure policy.
//! - [`Transform`] — pulls one envelope, processes it in place, forwards
//!   it unchanged in identity.
//! - [`Reorder`] — terminal stage; retains completed envelopes in an
//!   indexed buffer keyed by local completion order.
//! - [`Sink`] — pulls, processes for side effects, discards.
//!
//! All specializations share the same resilience policy: a `process`
//! failure or panic is logged and the loop continues. Workers never crash
//! their thread over a single item.

mod reorder;
mod sink;
mod source;
mod transform;

pub use reorder::{Reorder, ReorderBuffer, ReorderMode};
pub use sink::Sink;
pub use source::Source;
pub use transform::Transform;

use crate::affinity;
use crate::boundary::Boundary;
use crate::bridge::StageEvent;
use crate::envelope::Envelope;
use crate::profiler::StageProfiler;
use crossbeam_channel::Sender;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The per-stage processing capability.
///
/// Returns `true` on success. `false` signals a recoverable per-item
/// failure: the worker skips the item without propagating the error.
pub trait Process: Send {
    fn process(&mut self, envelope: &mut Envelope) -> bool;
}

impl<F> Process for F
where
    F: FnMut(&mut Envelope) -> bool + Send,
{
    fn process(&mut self, envelope: &mut Envelope) -> bool {
        self(envelope)
    }
}

/// Boundary wiring and shared control state handed to a worker by the
/// orchestrator before its thread starts.
///
/// Boundaries are reference-counted: the orchestrator owns their lifetime
/// and a worker never outlives the boundaries it references.
#[derive(Clone)]
pub struct StageContext {
    /// Boundary this worker reads from. `None` for sources.
    pub input: Option<Arc<Boundary>>,
    /// Boundary this worker writes to. `None` for terminal stages.
    pub output: Option<Arc<Boundary>>,
    /// Cooperative exit flag, sampled once per loop iteration.
    pub exit: Arc<AtomicBool>,
    /// Diagnostics channel back to the orchestrator.
    pub events: Option<Sender<StageEvent>>,
}

impl StageContext {
    /// A detached context: no boundaries, private exit flag, no events.
    /// Useful for driving a worker directly in tests.
    pub fn detached() -> Self {
        Self {
            input: None,
            output: None,
            exit: Arc::new(AtomicBool::new(false)),
            events: None,
        }
    }
}

/// Abstract pipeline worker, driven by the orchestrator.
///
/// `run` is the parallel-mode entry point, invoked once on a dedicated
/// thread. `step` is the sequential-mode entry point: one non-blocking
/// iteration, returning `true` if an item was handled.
pub trait Worker: Send {
    /// Stage instance name, used for thread naming and diagnostics.
    fn name(&self) -> &str;

    /// Wire this worker to its boundaries and control state.
    fn bind(&mut self, ctx: StageContext);

    /// Blocking loop: runs until the exit flag is set or the input
    /// boundary is closed and drained.
    fn run(&mut self);

    /// One non-blocking iteration for sequential (round-robin) execution.
    fn step(&mut self) -> bool;

    /// Monotonic count of successfully processed items.
    fn processed(&self) -> u64;
}

/// State common to every stage specialization: boundary references,
/// counters, profiler, pinning target and the diagnostics sender.
pub(crate) struct WorkerCore {
    name: String,
    cpu_core: Option<usize>,
    profiler: StageProfiler,
    processed: u64,
    ctx: StageContext,
}

impl WorkerCore {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cpu_core: None,
            profiler: StageProfiler::default(),
            processed: 0,
            ctx: StageContext::detached(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_cpu_core(&mut self, core: Option<usize>) {
        self.cpu_core = core;
    }

    pub(crate) fn set_profiling(&mut self, enabled: bool) {
        self.profiler = StageProfiler::new(enabled);
    }

    pub(crate) fn profiler_mut(&mut self) -> &mut StageProfiler {
        &mut self.profiler
    }

    pub(crate) fn bind(&mut self, ctx: StageContext) {
        self.ctx = ctx;
    }

    pub(crate) fn input(&self) -> Option<&Arc<Boundary>> {
        self.ctx.input.as_ref()
    }

    pub(crate) fn output(&self) -> Option<&Arc<Boundary>> {
        self.ctx.output.as_ref()
    }

    pub(crate) fn should_exit(&self) -> bool {
        self.ctx.exit.load(Ordering::Relaxed)
    }

    pub(crate) fn processed(&self) -> u64 {
        self.processed
    }

    pub(crate) fn record_success(&mut self) {
        self.processed += 1;
    }

    /// Blocking pop from the input boundary. `None` means the boundary is
    /// closed and drained (or the worker has no input at all).
    pub(crate) fn pop_input(&self) -> Option<Envelope> {
        self.ctx.input.as_ref()?.pop()
    }

    /// Non-blocking pop for sequential mode.
    pub(crate) fn try_pop_input(&self) -> Option<Envelope> {
        self.ctx.input.as_ref()?.try_pop()
    }

    /// Push to the output boundary, waking one downstream waiter.
    pub(crate) fn push_output(&self, envelope: Envelope) {
        if let Some(output) = &self.ctx.output {
            if !output.push(envelope) {
                tracing::debug!(stage = %self.name, "Output boundary closed, envelope dropped");
            }
        }
    }

    /// Fire-and-forget diagnostics.
    pub(crate) fn emit(&self, event: StageEvent) {
        if let Some(events) = &self.ctx.events {
            let _ = events.try_send(event);
        }
    }

    /// Entry bookkeeping for `run`: pin the thread if a core was
    /// configured (warning on failure, never fatal) and announce startup.
    pub(crate) fn enter(&self) {
        if let Some(core) = self.cpu_core {
            match affinity::pin_current_thread(core) {
                Ok(()) => {
                    tracing::debug!(stage = %self.name, core, "Stage thread pinned")
                }
                Err(e) => {
                    tracing::warn!(stage = %self.name, core, error = %e, "CPU pinning failed, running unpinned")
                }
            }
        } else {
            tracing::debug!(stage = %self.name, "Stage not bound to a specific CPU");
        }
        self.emit(StageEvent::Started {
            stage: self.name.clone(),
        });
        tracing::info!(stage = %self.name, "Stage started");
    }

    /// Exit bookkeeping for `run`: final profile report and exit event.
    pub(crate) fn exited(&self) {
        if self.profiler.is_enabled() {
            tracing::info!("{}", self.profiler.report(&self.name));
            self.emit(StageEvent::Profile {
                stage: self.name.clone(),
                average: self.profiler.average(),
                total: self.profiler.total(),
                count: self.profiler.count(),
            });
        }
        self.emit(StageEvent::Exited {
            stage: self.name.clone(),
            processed: self.processed,
        });
        tracing::info!(stage = %self.name, processed = self.processed, "Stage exited");
    }

    /// Run the supplied `process` step, translating a panic into a
    /// recoverable per-item failure. The worker loop never dies over a
    /// single bad item.
    pub(crate) fn run_process<P: Process>(
        &self,
        process: &mut P,
        envelope: &mut Envelope,
    ) -> bool {
        match catch_unwind(AssertUnwindSafe(|| process.process(envelope))) {
            Ok(ok) => {
                if !ok {
                    tracing::error!(
                        stage = %self.name,
                        envelope = %envelope.id(),
                        "Stage failed to process envelope"
                    );
                    self.emit(StageEvent::ItemFailed {
                        stage: self.name.clone(),
                        envelope_id: envelope.id().to_string(),
                    });
                }
                ok
            }
            Err(_) => {
                tracing::error!(
                    stage = %self.name,
                    envelope = %envelope.id(),
                    "Panic in stage process, skipping item"
                );
                self.emit(StageEvent::ItemFailed {
                    stage: self.name.clone(),
                    envelope_id: envelope.id().to_string(),
                });
                false
            }
        }
    }
}
