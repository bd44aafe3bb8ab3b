//! Stage boundaries — the synchronization triple between consecutive stages.
//!
//! A [`Boundary`] bundles the mutual-exclusion lock, condition variable and
//! FIFO queue guarding one stage-to-stage handoff, plus a reserved
//! signalling flag. The orchestrator allocates one boundary per gap between
//! consecutive stages and hands `Arc` clones to the workers on either side.
//!
//! # Invariants
//!
//! - The queue is only ever mutated while holding its paired lock.
//! - The condition variable is only waited on / notified in association
//!   with that same lock.
//! - A single producer's pushes are observed by the consumer in FIFO
//!   order. With multiple producers the interleaving is unspecified, but
//!   each producer's own sub-sequence is order-preserved.
//!
//! # Shutdown
//!
//! A flag-only cancellation scheme would leave workers parked in the
//! condition-variable wait forever. `close()` therefore marks the boundary
//! closed under the lock and wakes *all* waiters; [`Boundary::pop`]
//! re-checks the predicate after every wake and returns `None` once the
//! boundary is closed and drained.

use crate::envelope::Envelope;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
struct Inner {
    queue: VecDeque<Envelope>,
    closed: bool,
}

/// The lock + condition-variable + queue bundle guarding one stage boundary.
#[derive(Debug, Default)]
pub struct Boundary {
    inner: Mutex<Inner>,
    available: Condvar,
    /// Reserved for future signalling between stages. Not load-bearing.
    flag: AtomicBool,
}

impl Boundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an envelope at the tail and wake one waiting consumer.
    ///
    /// Returns `false` if the boundary is closed; the envelope is dropped
    /// in that case (shutdown is already in progress).
    pub fn push(&self, envelope: Envelope) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return false;
            }
            inner.queue.push_back(envelope);
        }
        // Single-waiter wake: each boundary has a single logical consumer
        // per item, so notify_one suffices outside of shutdown.
        self.available.notify_one();
        true
    }

    /// Dequeue the head envelope, blocking while the queue is empty.
    ///
    /// Suspends the calling thread until an envelope arrives or the
    /// boundary is closed. Returns `None` only when the boundary is closed
    /// and drained.
    pub fn pop(&self) -> Option<Envelope> {
        let mut inner = self.inner.lock();
        while inner.queue.is_empty() && !inner.closed {
            self.available.wait(&mut inner);
        }
        inner.queue.pop_front()
    }

    /// Non-blocking dequeue, for sequential (round-robin) execution.
    pub fn try_pop(&self) -> Option<Envelope> {
        self.inner.lock().queue.pop_front()
    }

    /// Current queue length.
    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().queue.is_empty()
    }

    /// Close the boundary: no further pushes are accepted and every
    /// blocked consumer is woken so it can observe shutdown.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock();
            inner.closed = true;
        }
        self.available.notify_all();
    }

    /// Whether the boundary has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Read the reserved signalling flag.
    pub fn flag(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Set the reserved signalling flag.
    pub fn set_flag(&self, value: bool) {
        self.flag.store(value, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn envelope(id: &str) -> Envelope {
        Envelope::with_id(id)
    }

    #[test]
    fn test_fifo_order_single_producer() {
        let boundary = Boundary::new();
        for i in 0..10 {
            assert!(boundary.push(envelope(&format!("e{i}"))));
        }
        for i in 0..10 {
            assert_eq!(boundary.pop().unwrap().id(), format!("e{i}"));
        }
    }

    #[test]
    fn test_try_pop_empty() {
        let boundary = Boundary::new();
        assert!(boundary.try_pop().is_none());
        boundary.push(envelope("e0"));
        assert_eq!(boundary.try_pop().unwrap().id(), "e0");
    }

    #[test]
    fn test_pop_blocks_until_push() {
        let boundary = Arc::new(Boundary::new());
        let producer = boundary.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            producer.push(envelope("late"));
        });
        // Consumer parks until the producer delivers.
        let got = boundary.pop().unwrap();
        assert_eq!(got.id(), "late");
        handle.join().unwrap();
    }

    #[test]
    fn test_close_wakes_blocked_consumers() {
        let boundary = Arc::new(Boundary::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let consumer = boundary.clone();
            handles.push(std::thread::spawn(move || consumer.pop()));
        }
        std::thread::sleep(Duration::from_millis(20));
        boundary.close();
        for handle in handles {
            assert!(handle.join().unwrap().is_none());
        }
    }

    #[test]
    fn test_close_drains_before_none() {
        let boundary = Boundary::new();
        boundary.push(envelope("e0"));
        boundary.close();
        // Queued items remain retrievable after close...
        assert_eq!(boundary.pop().unwrap().id(), "e0");
        // ...then pop reports shutdown.
        assert!(boundary.pop().is_none());
        // And new pushes are refused.
        assert!(!boundary.push(envelope("e1")));
    }

    #[test]
    fn test_reserved_flag() {
        let boundary = Boundary::new();
        assert!(!boundary.flag());
        boundary.set_flag(true);
        assert!(boundary.flag());
    }

    #[test]
    fn test_multi_producer_subsequences_preserved() {
        let boundary = Arc::new(Boundary::new());
        let mut handles = Vec::new();
        for producer_id in 0..3 {
            let b = boundary.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..50 {
                    b.push(envelope(&format!("p{producer_id}-{i}")));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let mut next = [0usize; 3];
        while let Some(env) = boundary.try_pop() {
            let (producer, seq) = env.id()[1..].split_once('-').unwrap();
            let producer: usize = producer.parse().unwrap();
            let seq: usize = seq.parse().unwrap();
            // Each producer's own sub-sequence arrives in order.
            assert_eq!(seq, next[producer]);
            next[producer] += 1;
        }
        assert_eq!(next, [50, 50, 50]);
    }
}
