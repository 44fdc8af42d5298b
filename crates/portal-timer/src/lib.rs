//! Timers for the session actor.
//!
//! Two primitives, both built to sit inside a `tokio::select!` loop:
//!
//! - [`Deadline`]: a single-shot, resettable deadline (the inactivity
//!   timeout). Arming it again replaces the pending deadline, so at most
//!   one is ever pending.
//! - [`Ticker`]: a fixed-period tick (the periodic token validator).
//!
//! When there is nothing to wait for (deadline disarmed, ticker paused or
//! disabled) the wait future pends forever instead of resolving, and the
//! `select!` simply keeps serving its other branches:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         () = inactivity.wait() => end_session("inactivity_timeout"),
//!         _ = validator.tick() => revalidate(),
//!     }
//! }
//! ```
//!
//! Both wait futures are cancel-safe: dropping one before it resolves
//! leaves the timer exactly as it was.

use std::time::Duration;

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

/// A single-shot deadline that can be re-armed or cancelled.
#[derive(Debug, Default)]
pub struct Deadline {
    at: Option<TokioInstant>,
}

impl Deadline {
    /// Creates a disarmed deadline.
    pub fn new() -> Self {
        Self { at: None }
    }

    /// Schedules the deadline `after` from now, replacing any pending one.
    pub fn arm(&mut self, after: Duration) {
        let replaced = self.at.is_some();
        self.at = Some(TokioInstant::now() + after);
        trace!(after_secs = after.as_secs(), replaced, "deadline armed");
    }

    /// Cancels the pending deadline, if any. Idempotent.
    pub fn disarm(&mut self) {
        if self.at.take().is_some() {
            trace!("deadline disarmed");
        }
    }

    /// Whether a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.at.is_some()
    }

    /// Time left until the deadline fires, `None` when disarmed.
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(TokioInstant::now()))
    }

    /// Waits for the pending deadline and disarms it.
    ///
    /// Pends forever while disarmed.
    pub async fn wait(&mut self) {
        let Some(at) = self.at else {
            return std::future::pending().await;
        };
        time::sleep_until(at).await;
        self.at = None;
    }
}

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

/// Information about one fired tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// `true` if the tick fired late (more than 10% of a period).
    pub overrun: bool,
    /// Whole periods missed because the loop was busy.
    pub ticks_skipped: u64,
}

/// Fixed-period ticker.
///
/// The first tick fires one period after creation. Overruns are skipped:
/// after a late tick the next one is scheduled a full period from now
/// rather than firing a burst to catch up. A zero period disables the
/// ticker.
#[derive(Debug)]
pub struct Ticker {
    period: Option<Duration>,
    next: Option<TokioInstant>,
    tick_count: u64,
    paused: bool,
}

impl Ticker {
    /// Creates a ticker firing every `period`.
    pub fn new(period: Duration) -> Self {
        let period = (!period.is_zero()).then_some(period);
        match period {
            Some(p) => debug!(period_secs = p.as_secs(), "ticker created"),
            None => debug!("ticker created disabled (zero period)"),
        }
        Self {
            period,
            next: period.map(|p| TokioInstant::now() + p),
            tick_count: 0,
            paused: false,
        }
    }

    /// Waits for the next tick.
    ///
    /// Pends forever while paused or disabled.
    pub async fn tick(&mut self) -> TickInfo {
        let (next, period) = match (self.next, self.period) {
            (Some(next), Some(period)) if !self.paused => (next, period),
            _ => return std::future::pending().await,
        };

        time::sleep_until(next).await;

        let now = TokioInstant::now();
        self.tick_count += 1;

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > period / 10;
        let ticks_skipped = if overrun {
            (late_by.as_nanos() / period.as_nanos()) as u64
        } else {
            0
        };
        if ticks_skipped > 0 {
            warn!(
                tick = self.tick_count,
                skipped = ticks_skipped,
                late_secs = late_by.as_secs_f64(),
                "ticker overrun, skipping ahead"
            );
        }

        // Always schedule from now, not from the missed deadline.
        self.next = Some(now + period);

        trace!(tick = self.tick_count, overrun, "tick fired");
        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    /// Stops ticking until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "ticker paused");
        }
    }

    /// Restarts ticking; the next tick is a full period from now.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next = self.period.map(|p| TokioInstant::now() + p);
            debug!(tick = self.tick_count, "ticker resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether the ticker was created with a zero period.
    pub fn is_disabled(&self) -> bool {
        self.period.is_none()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }
}
