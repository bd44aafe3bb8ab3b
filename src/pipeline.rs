//! Pipeline orchestrator — wires stages together and drives them.
//!
//! For `N` stages the orchestrator allocates `N-1` boundaries (one per gap
//! between consecutive stages) and binds workers so that stage `i` reads
//! boundary `i-1` and writes boundary `i`; stage 0 has no input, stage
//! `N-1` has no output. The orchestrator exclusively owns the lifetime of
//! every boundary (via `Arc`) and of the worker threads — a worker never
//! outlives the boundaries it references.
//!
//! Two run modes:
//!
//! - **Parallel**: one dedicated OS thread per worker instance, all
//!   running concurrently until shutdown.
//! - **Sequential**: a fixed round-robin over every worker's single
//!   processing step on the calling thread — deterministic replay for
//!   testing and debugging, at the cost of throughput.

use crate::boundary::Boundary;
use crate::bridge::{event_channel, PipelineMonitor, StageEvent};
use crate::error::{PipelineError, Result};
use crate::stage::{StageContext, Worker};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Workers grouped by stage. Stage `i` of the pipeline runs every worker
/// in `stages[i]`; multiple workers per stage fan in/out over the same
/// pair of boundaries.
pub type StagedWorkers = Vec<Vec<Box<dyn Worker>>>;

/// Allocates boundaries, binds workers and drives them in parallel or
/// sequentially.
pub struct Pipeline {
    boundaries: Vec<Arc<Boundary>>,
    stage_count: usize,
    exit: Arc<AtomicBool>,
    event_tx: Sender<StageEvent>,
    handles: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Create a pipeline for `stage_count` stages, allocating one boundary
    /// per gap between consecutive stages. Returns the pipeline and the
    /// monitor handle for draining stage diagnostics.
    pub fn new(stage_count: usize) -> (Self, PipelineMonitor) {
        let boundaries = (0..stage_count.saturating_sub(1))
            .map(|_| Arc::new(Boundary::new()))
            .collect();
        let (event_tx, monitor) = event_channel();
        (
            Self {
                boundaries,
                stage_count,
                exit: Arc::new(AtomicBool::new(false)),
                event_tx,
                handles: Vec::new(),
            },
            monitor,
        )
    }

    /// The boundary between stage `index` and stage `index + 1`.
    pub fn boundary(&self, index: usize) -> Option<Arc<Boundary>> {
        self.boundaries.get(index).cloned()
    }

    /// Number of stages this pipeline was built for.
    pub fn stage_count(&self) -> usize {
        self.stage_count
    }

    /// Whether any worker threads are currently attached.
    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }

    fn context_for_stage(&self, stage: usize) -> StageContext {
        StageContext {
            input: if stage == 0 {
                None
            } else {
                self.boundaries.get(stage - 1).cloned()
            },
            output: self.boundaries.get(stage).cloned(),
            exit: self.exit.clone(),
            events: Some(self.event_tx.clone()),
        }
    }

    fn check_stage_count(&self, stages: &StagedWorkers) -> Result<()> {
        if stages.len() != self.stage_count {
            return Err(PipelineError::Config(format!(
                "pipeline built for {} stages, got {}",
                self.stage_count,
                stages.len()
            )));
        }
        Ok(())
    }

    /// Spawn one thread per worker instance and let every stage run
    /// concurrently. Returns once all threads are launched; use
    /// [`Pipeline::shutdown`] to stop and join them.
    pub fn run_parallel(&mut self, stages: StagedWorkers) -> Result<()> {
        self.check_stage_count(&stages)?;

        for (stage_index, workers) in stages.into_iter().enumerate() {
            for mut worker in workers {
                worker.bind(self.context_for_stage(stage_index));
                let handle = std::thread::Builder::new()
                    .name(worker.name().to_string())
                    .spawn(move || worker.run())?;
                self.handles.push(handle);
            }
        }
        tracing::info!(
            stages = self.stage_count,
            threads = self.handles.len(),
            "Pipeline running in parallel mode"
        );
        Ok(())
    }

    /// Drive every worker's single processing step in a fixed round-robin
    /// on the calling thread, for `passes` full sweeps (or until the exit
    /// flag is raised). Deterministic by construction.
    pub fn run_sequential(&mut self, stages: &mut StagedWorkers, passes: usize) -> Result<()> {
        self.check_stage_count(stages)?;

        for (stage_index, workers) in stages.iter_mut().enumerate() {
            let ctx = self.context_for_stage(stage_index);
            for worker in workers {
                worker.bind(ctx.clone());
            }
        }

        tracing::info!(
            stages = self.stage_count,
            passes,
            "Pipeline running in sequential mode"
        );
        for _ in 0..passes {
            if self.exit.load(Ordering::Relaxed) {
                break;
            }
            for workers in stages.iter_mut() {
                for worker in workers.iter_mut() {
                    worker.step();
                }
            }
        }
        Ok(())
    }

    /// Request cooperative shutdown: raise the exit flag, close every
    /// boundary so blocked workers wake, then join all threads.
    pub fn shutdown(&mut self) {
        self.exit.store(true, Ordering::Relaxed);
        for boundary in &self.boundaries {
            boundary.close();
        }
        for handle in self.handles.drain(..) {
            let name = handle.thread().name().unwrap_or("<worker>").to_string();
            if handle.join().is_err() {
                tracing::error!(stage = %name, "Worker thread panicked outside its loop");
            }
        }
        tracing::info!("Pipeline shut down");
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.is_running() {
            self.shutdown();
        }
    }
}
