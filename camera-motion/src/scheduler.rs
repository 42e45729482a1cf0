//! Time source and cancellable scheduled tasks
//!
//! Every timer chain in the crate (transition animation frames, drift
//! retargets, preset cycling, frame pacing) is a [`ScheduledTask`]: armed for
//! an instant, polled by its owner, cancelled idempotently. Nothing fires on
//! its own; owners check `fire_if_due` from their `poll`, so a cancelled task
//! can never run with stale state after a restart.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time source
pub trait Clock {
    /// Current instant
    fn now(&self) -> Instant;
}

/// Shared clock handle passed to every component
pub type SharedClock = Rc<dyn Clock>;

/// Runtime clock read from Tokio's timer
///
/// Follows the runtime's paused or advanced time, so deadlines handed to
/// `tokio::time::sleep_until` line up with what components observe.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Hand-driven clock for tests and offline rendering
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            now: Cell::new(Instant::now()),
        })
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Move time forward by whole milliseconds
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// Handle for one pending continuation of a timer chain
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    deadline: Option<Instant>,
}

impl ScheduledTask {
    /// Create an unarmed task
    pub fn new() -> Self {
        Self { deadline: None }
    }

    /// Arm (or re-arm) the task for an instant
    pub fn arm_at(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    /// Arm the task `delay` after `now`
    pub fn arm_after(&mut self, now: Instant, delay: Duration) {
        self.arm_at(now + delay);
    }

    /// Discard the pending continuation (no-op if not armed)
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Check if a continuation is pending
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// When the pending continuation is due
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the continuation is due (zero when overdue)
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    /// Disarm and return true if the task is due at `now`
    ///
    /// The owner re-arms the task if the chain continues.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Earliest of several optional deadlines
pub fn earliest(deadlines: impl IntoIterator<Item = Option<Instant>>) -> Option<Instant> {
    deadlines.into_iter().flatten().min()
}
