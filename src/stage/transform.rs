//! Transform stage — the pre-processing / inference-adjacent pattern.

use crate::stage::{Process, StageContext, Worker, WorkerCore};

/// A stage with both an input and an output boundary.
///
/// Each iteration pops one envelope (blocking), lets `process` mutate it in
/// place, and pushes the same envelope downstream, unmodified in identity.
/// A `process` failure drops the envelope instead of forwarding it.
pub struct Transform<P: Process> {
    core: WorkerCore,
    process: P,
}

impl<P: Process> Transform<P> {
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
        self.core.push_output(envelope);
        self.core.record_success();
        self.core.profiler_mut().stop();
        true
    }
}

impl<P: Process> Worker for Transform<P> {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn bind(&mut self, ctx: StageContext) {
        self.core.bind(ctx);
    }

    fn run(&mut self) {
        self.core.enter();

        while !self.core.should_exit() {
            // A `None` pop means the input boundary is closed and drained:
            // nothing more will ever arrive.
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
    use std::sync::Arc;

    fn wire<P: Process>(t: &mut Transform<P>) -> (Arc<Boundary>, Arc<Boundary>) {
        let input = Arc::new(Boundary::new());
        let output = Arc::new(Boundary::new());
        t.bind(StageContext {
            input: Some(input.clone()),
            output: Some(output.clone()),
            exit: Arc::new(AtomicBool::new(false)),
            events: None,
        });
        (input, output)
    }

    #[test]
    fn test_step_transforms_in_place() {
        let mut transform = Transform::new("scale", |env: &mut Envelope| {
            let v = env.try_get_float("v").unwrap_or(0.0);
            env.insert("v", v * 10.0);
            true
        });
        let (input, output) = wire(&mut transform);

        let mut env = Envelope::with_id("e0");
        env.insert("v", 4.2f32);
        input.push(env);

        assert!(transform.step());
        let out = output.pop().unwrap();
        // Identity is preserved across the stage.
        assert_eq!(out.id(), "e0");
        assert_eq!(out.get_float("v").unwrap(), 42.0);
    }

    #[test]
    fn test_failure_drops_envelope() {
        let mut transform = Transform::new("reject", |_: &mut Envelope| false);
        let (input, output) = wire(&mut transform);

        input.push(Envelope::with_id("e0"));
        assert!(!transform.step());
        assert!(output.is_empty());
        assert_eq!(transform.processed(), 0);
    }

    #[test]
    fn test_run_drains_then_exits_on_close() {
        let mut transform = Transform::new("pass", |_: &mut Envelope| true);
        let (input, output) = wire(&mut transform);

        for i in 0..5 {
            input.push(Envelope::with_id(format!("e{i}")));
        }
        input.close();

        // No exit flag needed: the closed boundary ends the loop.
        transform.run();
        assert_eq!(transform.processed(), 5);
        assert_eq!(output.len(), 5);
    }

    mockall::mock! {
        Proc {}

        impl Process for Proc {
            fn process(&mut self, envelope: &mut Envelope) -> bool;
        }
    }

    #[test]
    fn test_process_invoked_exactly_once_per_envelope() {
        let mut process = MockProc::new();
        process.expect_process().times(3).returning(|env| {
            env.insert("seen", 1);
            true
        });

        let mut transform = Transform::new("mocked", process);
        let (input, output) = wire(&mut transform);
        for i in 0..3 {
            input.push(Envelope::with_id(format!("e{i}")));
        }
        input.close();
        transform.run();

        assert_eq!(transform.processed(), 3);
        for _ in 0..3 {
            assert_eq!(output.pop().unwrap().get_int("seen").unwrap(), 1);
        }
    }

    #[test]
    fn test_panic_in_process_does_not_kill_worker() {
        let mut transform = Transform::new("explosive", |env: &mut Envelope| {
            if env.id() == "e1" {
                panic!("boom");
            }
            true
        });
        let (input, output) = wire(&mut transform);

        for i in 0..3 {
            input.push(Envelope::with_id(format!("e{i}")));
        }
        input.close();
        transform.run();

        // e1 was skipped, the loop carried on.
        assert_eq!(transform.processed(), 2);
        assert_eq!(output.pop().unwrap().id(), "e0");
        assert_eq!(output.pop().unwrap().id(), "e2");
    }
}
