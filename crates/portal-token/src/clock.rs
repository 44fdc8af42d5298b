//! Time sources for issuing and validating tokens.
//!
//! Tokens carry absolute timestamps (they outlive the process in the
//! store), so the codec needs wall-clock seconds, not a monotonic
//! `Instant`. Tests, however, want to fast-forward time. [`TokioClock`]
//! bridges the two: it starts at the real wall-clock time and then moves
//! with Tokio's clock, which `tokio::time::pause()` lets tests control.

use tokio::time::Instant as TokioInstant;

/// Source of "now" in unix seconds.
pub trait Clock: Send + Sync + 'static {
    /// Current time as seconds since the unix epoch.
    fn now_unix(&self) -> u64;
}

/// Real wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        // Negative only for a clock set before 1970.
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

/// Wall-clock time that advances with the Tokio runtime clock.
///
/// Under `#[tokio::test(start_paused = true)]`, sleeping or calling
/// `tokio::time::advance` moves this clock forward by the same amount.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin_unix: u64,
    origin: TokioInstant,
}

impl TokioClock {
    /// Anchors the clock to the current wall-clock time.
    pub fn new() -> Self {
        Self::starting_at(SystemClock.now_unix())
    }

    /// Anchors the clock to an arbitrary unix timestamp.
    pub fn starting_at(origin_unix: u64) -> Self {
        Self {
            origin_unix,
            origin: TokioInstant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_unix(&self) -> u64 {
        self.origin_unix + self.origin.elapsed().as_secs()
    }
}
