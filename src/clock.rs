//! Clock abstraction for deterministic testing.
//!
//! Production code uses `SystemClock` (real time). Tests use `TestClock`
//! with manual time advancement, which makes dwell gating and scroll
//! cadence fully deterministic.

use std::sync::Mutex;
use std::time::Instant;

/// Trait abstracting time sources for testability.
///
/// All timestamps in the scroll pipeline are monotonic milliseconds from
/// an arbitrary epoch (process start for `SystemClock`).
pub trait Clock: Send + Sync {
    /// Returns the current monotonic time in milliseconds.
    fn monotonic_millis(&self) -> f64;
}

/// Production clock anchored at its own construction instant.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn monotonic_millis(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Test clock with manually controlled time.
pub struct TestClock {
    millis: Mutex<f64>,
}

impl TestClock {
    /// Create a test clock starting at zero milliseconds.
    pub fn new() -> Self {
        Self {
            millis: Mutex::new(0.0),
        }
    }

    /// Advance time by the given number of milliseconds.
    pub fn advance(&self, ms: f64) {
        *self.millis.lock().unwrap() += ms;
    }

    /// Set the monotonic timestamp explicitly.
    pub fn set_millis(&self, ms: f64) {
        *self.millis.lock().unwrap() = ms;
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn monotonic_millis(&self) -> f64 {
        *self.millis.lock().unwrap()
    }
}
