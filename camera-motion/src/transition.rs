//! Transition engine
//!
//! Cross-fades the live parameter set from one snapshot to another. Discrete
//! fields switch the moment a transition starts; continuous fields follow an
//! ease-in-out curve driven by elapsed time since the transition began, so the
//! duration is exact no matter how irregularly frames are polled.

use std::time::{Duration, Instant};

use crate::params::{FieldId, LiveParams, ParameterSet};
use crate::scheduler::{ScheduledTask, SharedClock};

/// Interval between animation steps (~60 Hz)
pub const ANIMATION_FRAME: Duration = Duration::from_millis(16);

/// Shortest allowed transition
pub const MIN_DURATION: Duration = Duration::from_millis(100);

/// Callback receiving every interpolated parameter set
pub type UpdateCallback = Box<dyn FnMut(&ParameterSet)>;

/// Callback receiving the new duration after `set_duration`
pub type DurationCallback = Box<dyn FnMut(Duration)>;

/// Quadratic ease-in-out over `[0, 1]`
pub fn ease_in_out(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        let inv = 1.0 - t;
        1.0 - 2.0 * inv * inv
    }
}

/// Blend the continuous fields of two sets; discrete fields come from `target`
pub fn interpolate(start: &ParameterSet, target: &ParameterSet, eased: f32) -> ParameterSet {
    let mut out = target.clone();
    for field in FieldId::continuous() {
        if let (Some(a), Some(b)) = (start.numeric(field), target.numeric(field)) {
            out.set_numeric(field, a + (b - a) * eased);
        }
    }
    out
}

#[derive(Debug, Clone)]
struct ActiveTransition {
    start: ParameterSet,
    target: ParameterSet,
    started_at: Instant,
    duration: Duration,
}

impl ActiveTransition {
    fn progress(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.started_at).as_secs_f64();
        (elapsed / self.duration.as_secs_f64()).min(1.0) as f32
    }
}

/// Drives timed interpolation of the live parameter set
pub struct TransitionEngine {
    live: LiveParams,
    clock: SharedClock,
    duration: Duration,
    active: Option<ActiveTransition>,
    frame: ScheduledTask,
    on_update: Option<UpdateCallback>,
    on_duration_changed: Option<DurationCallback>,
}

impl TransitionEngine {
    /// Create an idle engine writing to `live`
    pub fn new(live: LiveParams, clock: SharedClock, duration: Duration) -> Self {
        Self {
            live,
            clock,
            duration: duration.max(MIN_DURATION),
            active: None,
            frame: ScheduledTask::new(),
            on_update: None,
            on_duration_changed: None,
        }
    }

    /// Register the observer for interpolated values (replaces any previous one)
    pub fn set_on_update(&mut self, callback: impl FnMut(&ParameterSet) + 'static) {
        self.on_update = Some(Box::new(callback));
    }

    /// Register the observer for duration changes (replaces any previous one)
    pub fn set_on_duration_changed(&mut self, callback: impl FnMut(Duration) + 'static) {
        self.on_duration_changed = Some(Box::new(callback));
    }

    /// Check if a transition is in flight
    pub fn is_transitioning(&self) -> bool {
        self.active.is_some()
    }

    /// Length of future transitions
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Raw progress (0-1) of the in-flight transition
    pub fn progress(&self) -> Option<f32> {
        let now = self.clock.now();
        self.active.as_ref().map(|a| a.progress(now))
    }

    /// Target of the in-flight transition
    pub fn target(&self) -> Option<&ParameterSet> {
        self.active.as_ref().map(|a| &a.target)
    }

    /// When the next animation step is due
    pub fn next_deadline(&self) -> Option<Instant> {
        self.frame.deadline()
    }

    /// Change the length of future transitions (minimum 100ms)
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration = duration.max(MIN_DURATION);
        tracing::debug!(duration_ms = self.duration.as_millis() as u64, "Transition duration changed");
        if let Some(callback) = self.on_duration_changed.as_mut() {
            callback(self.duration);
        }
    }

    /// Begin interpolating towards `to`, cancelling any in-flight transition
    ///
    /// When a transition is already running, the start snapshot is the
    /// current live values rather than `from`, so chained switches continue
    /// from wherever the previous fade had reached.
    pub fn start_transition(&mut self, from: &ParameterSet, to: &ParameterSet) {
        let mut start = if self.active.is_some() {
            self.live.snapshot()
        } else {
            from.clone().clamped()
        };
        let target = to.clone().clamped();
        start.take_discrete(&target);

        self.live.set_discrete(&target);
        self.live.lease_angle();

        let now = self.clock.now();
        tracing::debug!(
            duration_ms = self.duration.as_millis() as u64,
            chained = self.active.is_some(),
            "Transition started"
        );
        self.active = Some(ActiveTransition {
            start,
            target,
            started_at: now,
            duration: self.duration,
        });
        self.frame.arm_at(now);
    }

    /// Stop the in-flight transition where it is (no-op when idle)
    pub fn cancel_transition(&mut self) {
        self.frame.cancel();
        if self.active.take().is_some() {
            self.live.release_angle();
            tracing::debug!("Transition cancelled");
        }
    }

    /// Cancel any transition and commit `target` instantly
    pub fn apply_immediately(&mut self, target: &ParameterSet) {
        self.cancel_transition();
        self.live.replace(target);
        let values = self.live.snapshot();
        self.notify(&values);
    }

    /// Run the animation step if one is due; returns true if a step ran
    pub fn poll(&mut self) -> bool {
        let now = self.clock.now();
        if !self.frame.fire_if_due(now) {
            return false;
        }
        self.step(now);
        true
    }

    fn step(&mut self, now: Instant) {
        let Some(active) = self.active.as_ref() else {
            return;
        };
        let t = active.progress(now);

        if t >= 1.0 {
            // Commit the exact target so no interpolation residue remains
            let target = active.target.clone();
            self.active = None;
            self.live.replace(&target);
            self.live.release_angle();
            tracing::debug!("Transition finished");
            self.notify(&target);
            return;
        }

        let values = interpolate(&active.start, &active.target, ease_in_out(t));
        self.live.replace(&values);
        self.notify(&values);
        self.frame.arm_after(now, ANIMATION_FRAME);
    }

    fn notify(&mut self, values: &ParameterSet) {
        if let Some(callback) = self.on_update.as_mut() {
            callback(values);
        }
    }
}
