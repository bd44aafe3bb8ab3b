//! Mock inference backend for testing without hardware.
//!
//! Produces deterministic synthetic outputs derived from the input tensor,
//! so stage logic can be exercised end to end with assertable results.
//! Optionally injects failures after a configurable number of runs.
//!
//! # Enabling
//!
//! Compiled for unit tests automatically; library consumers opt in with
//! the `mock-backend` feature:
//!
//! ```bash
//! cargo test --features mock-backend
//! ```

use crate::error::{PipelineError, Result};
use crate::inference::InferenceBackend;
use ndarray::ArrayD;

/// Deterministic stand-in for an accelerator backend.
///
/// Each output buffer `i` of size `n` is filled with
/// `mean(input) + i + j * 0.5` for element `j` — cheap, reproducible and
/// sensitive to the input, which is all tests need.
#[derive(Debug)]
pub struct MockBackend {
    model_path: String,
    output_sizes: Vec<usize>,
    outputs: Vec<Vec<f32>>,
    runs: u64,
    fail_after: Option<u64>,
}

impl MockBackend {
    /// "Load" a model. Fails on an empty path, modelling the fatal
    /// construction-time failure of a real backend.
    pub fn load(model_path: &str, output_sizes: &[usize]) -> Result<Self> {
        if model_path.is_empty() {
            return Err(PipelineError::Backend(
                "failed to load model: empty path".to_string(),
            ));
        }
        tracing::debug!(model = model_path, outputs = output_sizes.len(), "Mock model loaded");
        Ok(Self {
            model_path: model_path.to_string(),
            output_sizes: output_sizes.to_vec(),
            outputs: output_sizes.iter().map(|&n| vec![0.0; n]).collect(),
            runs: 0,
            fail_after: None,
        })
    }

    /// Make every run after the first `runs` fail, for error-path tests.
    pub fn fail_after(mut self, runs: u64) -> Self {
        self.fail_after = Some(runs);
        self
    }

    /// The path this backend was "loaded" from.
    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    /// Number of runs executed so far (successful or not).
    pub fn runs(&self) -> u64 {
        self.runs
    }
}

impl InferenceBackend for MockBackend {
    fn run(&mut self, input: &ArrayD<f32>) -> Result<()> {
        self.runs += 1;
        if let Some(limit) = self.fail_after {
            if self.runs > limit {
                return Err(PipelineError::Backend(format!(
                    "injected failure on run {}",
                    self.runs
                )));
            }
        }
        if input.is_empty() {
            return Err(PipelineError::Backend("empty input tensor".to_string()));
        }

        let mean = input.sum() / input.len() as f32;
        for (i, out) in self.outputs.iter_mut().enumerate() {
            for (j, v) in out.iter_mut().enumerate() {
                *v = mean + i as f32 + j as f32 * 0.5;
            }
        }
        Ok(())
    }

    fn output(&self, index: usize) -> Result<&[f32]> {
        self.outputs
            .get(index)
            .map(|v| v.as_slice())
            .ok_or_else(|| {
                PipelineError::Backend(format!(
                    "output index {index} out of range (backend has {})",
                    self.output_sizes.len()
                ))
            })
    }

    fn output_count(&self) -> usize {
        self.outputs.len()
    }
}
