/// Completion records and run counters.
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

/// A tick whose dispatch received a 200 response.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRecord {
    /// 1-based tick sequence number
    pub seq: u64,
    /// Nominal wall-clock instant of the tick
    pub tick: SystemTime,
    /// Nominal monotonic instant of the tick
    pub tick_instant: Instant,
    /// Time from the nominal tick to the full response
    pub latency: Duration,
}

impl CompletionRecord {
    /// Tick time as fractional seconds since the Unix epoch.
    pub fn tick_unix_secs(&self) -> f64 {
        self.tick
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    pub fn latency_secs(&self) -> f64 {
        self.latency.as_secs_f64()
    }
}

/// Counters reported when a run ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverSummary {
    pub ticks: u64,
    pub dispatched: u64,
    pub completed: u64,
    /// Failures swallowed by the drop or retry policy
    pub dropped: u64,
    /// Ticks with no free in-flight slot
    pub skipped: u64,
}

#[derive(Debug, Default)]
pub(crate) struct DriverStats {
    pub ticks: AtomicU64,
    pub dispatched: AtomicU64,
    pub completed: AtomicU64,
    pub dropped: AtomicU64,
    pub skipped: AtomicU64,
}

impl DriverStats {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DriverSummary {
        DriverSummary {
            ticks: self.ticks.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}
