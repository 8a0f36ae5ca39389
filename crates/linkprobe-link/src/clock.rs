//! Frame timestamps.
//!
//! Frames carry the sender's monotonic clock truncated to microseconds
//! within the current second, so latency is only meaningful between nodes
//! whose clocks tick in step and for delays under one second.

use std::sync::atomic::{AtomicU32, Ordering};

/// Microseconds in one timestamp period.
pub const USEC_PER_SEC: u32 = 1_000_000;

/// Source of frame timestamps.
pub trait Clock: Send + Sync {
    /// Sub-second part of the monotonic clock, in microseconds (0..1_000_000).
    fn now_usec(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now_usec(&self) -> u32 {
        (**self).now_usec()
    }
}

/// The system monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

#[cfg(unix)]
impl Clock for MonotonicClock {
    fn now_usec(&self) -> u32 {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `ts` is a valid, writable timespec; CLOCK_MONOTONIC is
        // always available on supported unix targets.
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
        if rc != 0 {
            return 0;
        }
        (ts.tv_nsec / 1000) as u32
    }
}

#[cfg(not(unix))]
impl Clock for MonotonicClock {
    fn now_usec(&self) -> u32 {
        use std::sync::OnceLock;
        use std::time::Instant;

        static EPOCH: OnceLock<Instant> = OnceLock::new();
        EPOCH.get_or_init(Instant::now).elapsed().subsec_micros()
    }
}

/// A clock that reports whatever it was last set to.
#[derive(Debug, Default)]
pub struct FixedClock(AtomicU32);

impl FixedClock {
    pub fn new(usec: u32) -> Self {
        Self(AtomicU32::new(usec))
    }

    pub fn set(&self, usec: u32) {
        self.0.store(usec % USEC_PER_SEC, Ordering::Relaxed);
    }
}

impl Clock for FixedClock {
    fn now_usec(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}
