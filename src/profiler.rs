//! Per-stage latency profiling.
//!
//! A [`StageProfiler`] measures the wall-clock time of individual
//! processing iterations. It is purely observational: enabled or disabled
//! at construction, it never affects control flow. A disabled profiler is
//! a no-op on every call.

use std::time::{Duration, Instant};

/// Accumulates per-iteration wall-clock timings for one stage.
#[derive(Debug, Clone)]
pub struct StageProfiler {
    enabled: bool,
    started_at: Option<Instant>,
    total: Duration,
    count: u64,
}

impl StageProfiler {
    /// Create a profiler. A disabled profiler records nothing.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            started_at: None,
            total: Duration::ZERO,
            count: 0,
        }
    }

    /// Whether profiling is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Begin timing one iteration.
    pub fn start(&mut self) {
        if self.enabled {
            self.started_at = Some(Instant::now());
        }
    }

    /// Finish timing the current iteration and fold it into the totals.
    ///
    /// A `stop` without a matching `start` is ignored.
    pub fn stop(&mut self) {
        if let Some(started) = self.started_at.take() {
            self.total += started.elapsed();
            self.count += 1;
        }
    }

    /// Average iteration time, or zero before the first sample.
    pub fn average(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total / self.count as u32
        }
    }

    /// Total accumulated time.
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Number of recorded iterations.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Reset all accumulated statistics.
    pub fn reset(&mut self) {
        self.started_at = None;
        self.total = Duration::ZERO;
        self.count = 0;
    }

    /// Human-readable summary for one stage.
    pub fn report(&self, name: &str) -> String {
        if !self.enabled {
            return format!("{name} profiler: disabled");
        }
        format!(
            "{name} profiler: total = {:.2} ms, average = {:.2} ms, count = {}",
            self.total.as_secs_f64() * 1000.0,
            self.average().as_secs_f64() * 1000.0,
            self.count,
        )
    }
}

impl Default for StageProfiler {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_profiler_records_nothing() {
        let mut p = StageProfiler::new(false);
        p.start();
        p.stop();
        assert_eq!(p.count(), 0);
        assert_eq!(p.total(), Duration::ZERO);
        assert!(p.report("Transform").contains("disabled"));
    }

    #[test]
    fn test_enabled_profiler_accumulates() {
        let mut p = StageProfiler::new(true);
        for _ in 0..3 {
            p.start();
            std::thread::sleep(Duration::from_millis(1));
            p.stop();
        }
        assert_eq!(p.count(), 3);
        assert!(p.total() >= Duration::from_millis(3));
        assert!(p.average() >= Duration::from_millis(1));
    }

    #[test]
    fn test_stop_without_start_is_ignored() {
        let mut p = StageProfiler::new(true);
        p.stop();
        assert_eq!(p.count(), 0);
    }

    #[test]
    fn test_reset() {
        let mut p = StageProfiler::new(true);
        p.start();
        p.stop();
        assert_eq!(p.count(), 1);
        p.reset();
        assert_eq!(p.count(), 0);
        assert_eq!(p.total(), Duration::ZERO);
    }
}
