//! # Flowline: Multi-Stage Streaming Pipeline Engine
//!
//! A thread-per-stage pipeline engine for real-time sensor and inference
//! workloads. Data enters through a [`Source`](stage::Source), flows
//! through [`Transform`](stage::Transform) stages, and leaves through a
//! [`Sink`](stage::Sink) or a terminal [`Reorder`](stage::Reorder) stage
//! that retains completed work by completion order. Stages communicate
//! through bounded-by-policy FIFO [`Boundary`](boundary::Boundary) queues
//! guarded by a lock and condition variable.
//!
//! ## Architecture
//!
//! - **Envelope**: typed, heterogeneous key/value carrier — the unit of
//!   work. Exactly one stage owns an envelope at a time; queue handoffs
//!   move it.
//! - **Stages**: each worker runs a dedicated thread (parallel mode) or a
//!   round-robin step (sequential mode), delegates the actual
//!   transformation to an application-supplied [`Process`](stage::Process)
//!   step, and survives per-item failures by skipping.
//! - **Pipeline**: the orchestrator owns every boundary and thread, wires
//!   stage `i` between boundaries `i-1` and `i`, and shuts down by raising
//!   the exit flag and broadcasting a wake through every boundary.
//! - **Observability**: workers report lifecycle and per-item diagnostics
//!   over a crossbeam channel drained through a
//!   [`PipelineMonitor`](bridge::PipelineMonitor); latency profiling is
//!   opt-in per stage.
//!
//! ## Example
//!
//! ```no_run
//! use flowline::{Envelope, Pipeline, StagedWorkers};
//! use flowline::stage::{Sink, Source, Transform};
//!
//! let (mut pipeline, monitor) = Pipeline::new(3);
//!
//! let source = Source::new("camera", |env: &mut Envelope| {
//!     env.insert("frame", vec![0u8; 640 * 480]);
//!     true
//! })
//! .with_max_queue_len(32);
//!
//! let transform = Transform::new("preprocess", |env: &mut Envelope| {
//!     env.try_get_bytes("frame").is_some()
//! })
//! .with_cpu_core(1)
//! .with_profiling(true);
//!
//! let sink = Sink::new("publisher", |env: &mut Envelope| {
//!     println!("done: {}", env.id());
//!     true
//! });
//!
//! let stages: StagedWorkers = vec![
//!     vec![Box::new(source)],
//!     vec![Box::new(transform)],
//!     vec![Box::new(sink)],
//! ];
//! pipeline.run_parallel(stages).unwrap();
//! std::thread::sleep(std::time::Duration::from_secs(1));
//! pipeline.shutdown();
//!
//! for event in monitor.drain() {
//!     println!("{event:?}");
//! }
//! ```

pub mod affinity;
pub mod boundary;
pub mod bridge;
pub mod config;
pub mod envelope;
pub mod error;
pub mod inference;
pub mod pipeline;
pub mod profiler;
pub mod stage;

// Re-export commonly used types
pub use boundary::Boundary;
pub use bridge::{PipelineMonitor, StageEvent};
pub use config::{PipelineConfig, StageConfig};
pub use envelope::{Envelope, Value, ValueKind};
pub use error::{PipelineError, Result};
pub use inference::InferenceBackend;
pub use pipeline::{Pipeline, StagedWorkers};
pub use profiler::StageProfiler;
pub use stage::{Process, Reorder, ReorderBuffer, ReorderMode, Sink, Source, StageContext, Transform, Worker};
