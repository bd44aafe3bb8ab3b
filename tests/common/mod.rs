//! Shared helpers for integration tests

use std::time::{Duration, Instant};

/// Install a tracing subscriber once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// Poll `cond` until it holds or `timeout` elapses. Returns whether the
/// condition was met.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// Extract the numeric suffix from an envelope id like `"src-42"`.
pub fn id_seq(id: &str) -> u64 {
    id.rsplit('-').next().unwrap().parse().unwrap()
}
