//! Inference backend collaborator boundary.
//!
//! Stages that wrap an accelerator (NPU, GPU, remote service) call the
//! backend synchronously inside `process`; any latency there directly
//! extends that worker's per-item processing time and is invisible to the
//! scheduler. The core only fixes the interface:
//!
//! - Construction is backend-specific and fallible. A model that fails to
//!   load is a construction-time error — the pipeline must not start the
//!   stage at all (see [`PipelineError::Backend`]).
//! - [`InferenceBackend::run`] executes one inference over an input
//!   tensor.
//! - [`InferenceBackend::output`] retrieves a result buffer by index;
//!   backends may expose several outputs per run.
//!
//! [`PipelineError::Backend`]: crate::error::PipelineError::Backend

#[cfg(any(test, feature = "mock-backend"))]
pub mod mock;

#[cfg(any(test, feature = "mock-backend"))]
pub use mock::MockBackend;

use crate::error::Result;
use ndarray::ArrayD;

/// Synchronous inference collaborator invoked from inside a stage's
/// `process` step.
pub trait InferenceBackend: Send {
    /// Execute one inference over `input`. Replaces all output buffers.
    fn run(&mut self, input: &ArrayD<f32>) -> Result<()>;

    /// Result buffer produced by the last `run`, by output index.
    fn output(&self, index: usize) -> Result<&[f32]>;

    /// Number of output buffers this backend produces per run.
    fn output_count(&self) -> usize;
}
