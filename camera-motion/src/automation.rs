//! Ambient drift automation
//!
//! Keeps the movement angle alive between preset changes: wait a random
//! 2-7s, glide linearly to a random heading over 1-11s, repeat forever.
//! Only the angle is touched, and only while the transition engine is not
//! holding it (see [`LiveParams`]).

use std::ops::Range;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::params::{AngleWriter, FieldId, LiveParams};
use crate::scheduler::{ScheduledTask, SharedClock};
use crate::transition::ANIMATION_FRAME;

/// Pause between glides, in milliseconds
pub const RETARGET_DELAY_MS: Range<u64> = 2_000..7_000;

/// Length of one glide, in milliseconds
pub const GLIDE_DURATION_MS: Range<u64> = 1_000..11_000;

#[derive(Debug, Clone, Copy)]
struct Glide {
    from: f32,
    to: f32,
    started_at: Instant,
    duration: Duration,
    writer: AngleWriter,
}

#[derive(Debug, Clone, Copy)]
enum DriftPhase {
    Stopped,
    Waiting,
    Gliding(Glide),
}

/// Perpetual randomized retargeting of the movement angle
pub struct AmbientDrift {
    live: LiveParams,
    clock: SharedClock,
    rng: StdRng,
    phase: DriftPhase,
    task: ScheduledTask,
    last_target: f32,
    glides_completed: u64,
    on_angle: Option<Box<dyn FnMut(f32)>>,
}

impl AmbientDrift {
    /// Create a stopped generator with an OS-seeded RNG
    pub fn new(live: LiveParams, clock: SharedClock) -> Self {
        Self::with_rng(live, clock, StdRng::from_os_rng())
    }

    /// Create a stopped generator with a seeded RNG
    pub fn with_seed(live: LiveParams, clock: SharedClock, seed: u64) -> Self {
        Self::with_rng(live, clock, StdRng::seed_from_u64(seed))
    }

    fn with_rng(live: LiveParams, clock: SharedClock, rng: StdRng) -> Self {
        Self {
            live,
            clock,
            rng,
            phase: DriftPhase::Stopped,
            task: ScheduledTask::new(),
            last_target: 0.0,
            glides_completed: 0,
            on_angle: None,
        }
    }

    /// Register an observer for every angle the generator writes
    pub fn set_on_angle(&mut self, callback: impl FnMut(f32) + 'static) {
        self.on_angle = Some(Box::new(callback));
    }

    /// Begin (or restart) drifting from `initial_angle`
    pub fn start(&mut self, initial_angle: f32) {
        self.last_target = clamp_angle(initial_angle);
        self.schedule_wait(self.clock.now());
        tracing::debug!(initial_angle = self.last_target, "Ambient drift started");
    }

    /// Halt drifting; safe to call repeatedly
    pub fn destroy(&mut self) {
        self.task.cancel();
        if !matches!(self.phase, DriftPhase::Stopped) {
            tracing::debug!(glides = self.glides_completed, "Ambient drift stopped");
        }
        self.phase = DriftPhase::Stopped;
    }

    /// Check if the generator is running
    pub fn is_running(&self) -> bool {
        !matches!(self.phase, DriftPhase::Stopped)
    }

    /// Check if a glide is in progress
    pub fn is_gliding(&self) -> bool {
        matches!(self.phase, DriftPhase::Gliding(_))
    }

    /// Heading of the most recently completed glide
    pub fn last_target(&self) -> f32 {
        self.last_target
    }

    /// Number of glides that reached their target
    pub fn glides_completed(&self) -> u64 {
        self.glides_completed
    }

    /// When the generator next needs polling
    pub fn next_deadline(&self) -> Option<Instant> {
        self.task.deadline()
    }

    /// Advance the generator if its task is due; returns true if it ran
    pub fn poll(&mut self) -> bool {
        let now = self.clock.now();
        if !self.task.fire_if_due(now) {
            return false;
        }
        match self.phase {
            DriftPhase::Stopped => {}
            DriftPhase::Waiting => self.begin_glide(now),
            DriftPhase::Gliding(glide) => self.step_glide(glide, now),
        }
        true
    }

    fn schedule_wait(&mut self, now: Instant) {
        let delay = Duration::from_millis(self.rng.random_range(RETARGET_DELAY_MS));
        self.phase = DriftPhase::Waiting;
        self.task.arm_after(now, delay);
    }

    fn begin_glide(&mut self, now: Instant) {
        let Some(writer) = self.live.begin_drift() else {
            // A transition owns the angle; try again after another pause
            self.schedule_wait(now);
            return;
        };
        let glide = Glide {
            from: self.live.angle(),
            to: self.rng.random_range(0.0..360.0),
            started_at: now,
            duration: Duration::from_millis(self.rng.random_range(GLIDE_DURATION_MS)),
            writer,
        };
        tracing::trace!(from = glide.from, to = glide.to, "Drift glide started");
        self.phase = DriftPhase::Gliding(glide);
        self.task.arm_after(now, ANIMATION_FRAME);
    }

    fn step_glide(&mut self, glide: Glide, now: Instant) {
        let elapsed = now.saturating_duration_since(glide.started_at).as_secs_f64();
        let t = (elapsed / glide.duration.as_secs_f64()).min(1.0) as f32;
        let angle = if t >= 1.0 {
            glide.to
        } else {
            glide.from + (glide.to - glide.from) * t
        };
        let angle = clamp_angle(angle);

        if !self.live.write_drift_angle(glide.writer, angle) {
            tracing::trace!("Drift glide interrupted");
            self.schedule_wait(now);
            return;
        }
        if let Some(callback) = self.on_angle.as_mut() {
            callback(angle);
        }

        if t >= 1.0 {
            self.last_target = glide.to;
            self.glides_completed += 1;
            self.schedule_wait(now);
        } else {
            self.task.arm_after(now, ANIMATION_FRAME);
        }
    }
}

fn clamp_angle(angle: f32) -> f32 {
    FieldId::MovementAngle
        .range()
        .map_or(angle, |range| range.clamp(angle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterSet;
    use crate::scheduler::ManualClock;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn drift(seed: u64) -> (AmbientDrift, LiveParams, Rc<ManualClock>) {
        let clock = ManualClock::new();
        let live = LiveParams::new(ParameterSet::default());
        let shared: SharedClock = clock.clone();
        (AmbientDrift::with_seed(live.clone(), shared, seed), live, clock)
    }

    fn run_for(drift: &mut AmbientDrift, clock: &ManualClock, ms: u64) {
        for _ in 0..ms / 16 {
            clock.advance(ANIMATION_FRAME);
            drift.poll();
        }
    }

    #[test]
    fn test_waits_before_first_glide() {
        let (mut drift, live, clock) = drift(7);
        drift.start(0.0);
        assert!(drift.is_running());
        run_for(&mut drift, &clock, 1_900);
        assert!(!drift.is_gliding());
        assert_eq!(live.angle(), 0.0);
    }

    #[test]
    fn test_keeps_retargeting_within_range() {
        let (mut drift, live, clock) = drift(42);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        drift.set_on_angle(move |a| sink.borrow_mut().push(a));
        drift.start(0.0);
        run_for(&mut drift, &clock, 120_000);

        assert!(drift.glides_completed() >= 5);
        assert!(seen.borrow().iter().all(|a| (0.0..360.0).contains(a)));
        assert!(drift.is_running());
        assert!((0.0..360.0).contains(&live.angle()));
    }

    #[test]
    fn test_glide_ends_on_target() {
        let (mut drift, live, clock) = drift(3);
        drift.start(0.0);
        while drift.glides_completed() == 0 {
            clock.advance(ANIMATION_FRAME);
            drift.poll();
        }
        assert_eq!(live.angle(), drift.last_target());
    }

    #[test]
    fn test_destroy_halts_writes() {
        let (mut drift, live, clock) = drift(11);
        drift.start(0.0);
        run_for(&mut drift, &clock, 20_000);
        drift.destroy();
        drift.destroy();
        let frozen = live.angle();
        run_for(&mut drift, &clock, 20_000);
        assert_eq!(live.angle(), frozen);
        assert!(drift.next_deadline().is_none());
    }

    #[test]
    fn test_yields_to_transition_lease() {
        let (mut drift, live, clock) = drift(5);
        live.lease_angle();
        drift.start(0.0);
        run_for(&mut drift, &clock, 60_000);
        assert_eq!(live.angle(), 0.0);
        assert_eq!(drift.glides_completed(), 0);
        assert!(drift.is_running());

        live.release_angle();
        run_for(&mut drift, &clock, 60_000);
        assert!(drift.glides_completed() > 0);
    }

    #[test]
    fn test_external_write_restarts_from_live_angle() {
        let (mut drift, live, clock) = drift(9);
        drift.start(0.0);
        while !drift.is_gliding() {
            clock.advance(ANIMATION_FRAME);
            drift.poll();
        }
        live.set_numeric(FieldId::MovementAngle, 123.0);
        clock.advance(ANIMATION_FRAME);
        drift.poll();
        assert!(!drift.is_gliding());
        assert_eq!(live.angle(), 123.0);
    }
}
