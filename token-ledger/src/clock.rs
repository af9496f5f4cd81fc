//! Timestamp sources for history entries
//!
//! Readings are nanoseconds since the Unix epoch and never go backwards.

use chrono::Utc;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonically non-decreasing clock
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current reading, never smaller than any earlier reading
    fn now(&self) -> u64;
}

/// Wall clock, clamped so that readings never decrease
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicU64,
}

impl SystemClock {
    /// Create new system clock
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        let wall = Utc::now()
            .timestamp_nanos_opt()
            .and_then(|nanos| u64::try_from(nanos).ok())
            .unwrap_or(0);

        // fetch_max returns the previous value; the reading is whichever is larger
        let previous = self.last.fetch_max(wall, Ordering::AcqRel);
        previous.max(wall)
    }
}

/// Manually driven clock for tests and deterministic replay
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create clock starting at `start`
    pub fn new(start: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Move the clock forward by `delta`
    pub fn advance(&self, delta: u64) {
        let _ = self
            .now
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| {
                Some(t.saturating_add(delta))
            });
    }

    /// Set the clock to `at`, ignored if it would move backwards
    pub fn set(&self, at: u64) {
        self.now.fetch_max(at, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}
