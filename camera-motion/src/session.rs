//! Motion session
//!
//! Wires every component around one live parameter set: the orchestrator
//! (with its transition engine), the ambient drift generator and the frame
//! pacer. All of them are plain pollable state machines; [`run_session`]
//! drives them on the current Tokio task by sleeping until the earliest
//! pending deadline.

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::automation::AmbientDrift;
use crate::frame::{FrameSink, FrameSource};
use crate::kernel::KernelFactory;
use crate::pacer::{FramePacer, TARGET_FRAME_INTERVAL};
use crate::params::{LiveParams, ParameterSet};
use crate::presets::{PresetOrchestrator, PresetStore};
use crate::scheduler::{earliest, ScheduledTask, SharedClock};
use crate::settings::MotionSettings;
use crate::storage::SharedBlobStore;
use crate::transition::TransitionEngine;

/// Wait used by the driver when nothing is scheduled
const IDLE_WAIT: Duration = Duration::from_millis(250);

/// Session construction options
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Pacer frame interval
    pub frame_interval: Duration,
    /// Seed for cycle selection and drift; OS entropy when `None`
    pub seed: Option<u64>,
    /// Period of the telemetry log line; disabled when `None`
    pub telemetry_interval: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            frame_interval: TARGET_FRAME_INTERVAL,
            seed: None,
            telemetry_interval: Some(Duration::from_secs(1)),
        }
    }
}

/// All orchestration components sharing one live parameter set
pub struct MotionSession {
    clock: SharedClock,
    live: LiveParams,
    blobs: SharedBlobStore,
    settings: Rc<Cell<MotionSettings>>,
    orchestrator: PresetOrchestrator,
    drift: AmbientDrift,
    pacer: FramePacer,
    telemetry_interval: Option<Duration>,
    telemetry: ScheduledTask,
}

impl MotionSession {
    /// Build a session, loading settings and presets from `blobs`
    ///
    /// An empty preset collection is seeded with the built-ins.
    pub fn new(
        clock: SharedClock,
        blobs: SharedBlobStore,
        factory: KernelFactory,
        options: &SessionOptions,
    ) -> Self {
        let settings = Rc::new(Cell::new(MotionSettings::load(&*blobs)));
        let live = LiveParams::new(ParameterSet::default());

        let mut transition =
            TransitionEngine::new(live.clone(), clock.clone(), settings.get().transition());
        {
            let settings = Rc::clone(&settings);
            let blobs = Rc::clone(&blobs);
            transition.set_on_duration_changed(move |duration| {
                let mut updated = settings.get();
                updated.transition_duration = duration.as_millis() as u64;
                settings.set(updated);
                updated.save(&*blobs);
            });
        }

        let orchestrator = PresetOrchestrator::new(
            PresetStore::new(Rc::clone(&blobs)),
            transition,
            live.clone(),
            clock.clone(),
            settings.get().cycle(),
        );
        let (mut orchestrator, drift) = match options.seed {
            Some(seed) => (
                orchestrator.with_seed(seed),
                AmbientDrift::with_seed(live.clone(), clock.clone(), seed.wrapping_add(1)),
            ),
            None => (orchestrator, AmbientDrift::new(live.clone(), clock.clone())),
        };
        orchestrator.seed_builtin_presets_if_empty();

        let pacer = FramePacer::new(live.clone(), clock.clone(), factory)
            .with_target_interval(options.frame_interval);

        Self {
            clock,
            live,
            blobs,
            settings,
            orchestrator,
            drift,
            pacer,
            telemetry_interval: options.telemetry_interval,
            telemetry: ScheduledTask::new(),
        }
    }

    /// Start drift and the pacer, and optionally cycling
    pub fn start(&mut self, source: Box<dyn FrameSource>, sink: Box<dyn FrameSink>, cycle: bool) {
        self.drift.start(self.live.angle());
        self.pacer.start(source, sink);
        if cycle {
            self.orchestrator.start_cycling();
        }
        if let Some(interval) = self.telemetry_interval {
            self.telemetry.arm_after(self.clock.now(), interval);
        }
        tracing::info!(
            presets = self.orchestrator.presets().len(),
            cycling = cycle,
            "Motion session started"
        );
    }

    /// Stop every timer chain; safe to call repeatedly
    pub fn stop(&mut self) {
        self.orchestrator.stop_cycling();
        self.orchestrator.cancel_transition();
        self.drift.destroy();
        self.pacer.stop();
        self.telemetry.cancel();
    }

    /// Run every due task; returns true if anything ran
    ///
    /// Unsaved-change detection runs only between transitions, when the live
    /// values are no longer being interpolated.
    pub fn poll(&mut self) -> bool {
        let mut ran = self.orchestrator.poll();
        ran |= self.drift.poll();
        ran |= self.pacer.poll();

        if self.telemetry.fire_if_due(self.clock.now()) {
            self.log_telemetry();
            if let Some(interval) = self.telemetry_interval {
                self.telemetry.arm_after(self.clock.now(), interval);
            }
            ran = true;
        }

        if !self.orchestrator.transition().is_transitioning() {
            let live = self.live.snapshot();
            self.orchestrator.check_for_unsaved_changes(&live);
        }
        ran
    }

    /// Earliest pending deadline across all chains
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest([
            self.orchestrator.next_deadline(),
            self.drift.next_deadline(),
            self.pacer.next_deadline(),
            self.telemetry.deadline(),
        ])
    }

    /// Change the transition duration, persisting the settings
    pub fn set_transition_duration(&mut self, duration: Duration) {
        self.orchestrator.transition_mut().set_duration(duration);
    }

    /// Change the cycle interval, persisting the settings
    pub fn set_cycle_interval(&mut self, interval: Duration) {
        self.orchestrator.set_cycle_interval(interval);
        let applied = self.orchestrator.state().cycle_interval;
        self.update_settings(|s| s.cycle_duration = applied.as_millis() as u64);
    }

    /// Record the ambient colour interval for the presentation layer
    ///
    /// Persisted with the other settings; no session timer is affected.
    pub fn set_color_interval(&mut self, interval: Duration) {
        self.update_settings(|s| s.color_interval_duration = interval.as_millis() as u64);
    }

    /// Current settings
    pub fn settings(&self) -> MotionSettings {
        self.settings.get()
    }

    pub fn live(&self) -> &LiveParams {
        &self.live
    }

    pub fn orchestrator(&self) -> &PresetOrchestrator {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut PresetOrchestrator {
        &mut self.orchestrator
    }

    pub fn drift(&self) -> &AmbientDrift {
        &self.drift
    }

    pub fn pacer(&self) -> &FramePacer {
        &self.pacer
    }

    fn update_settings(&mut self, change: impl FnOnce(&mut MotionSettings)) {
        let mut updated = self.settings.get();
        change(&mut updated);
        let updated = updated.clamped();
        self.settings.set(updated);
        updated.save(&*self.blobs);
    }

    fn log_telemetry(&self) {
        let stats = self.pacer.stats();
        tracing::info!(
            fps = stats.fps,
            compute_ms = stats.last_compute_time.as_secs_f64() * 1000.0,
            p95_ms = stats.compute.p95_ms,
            preset = self.orchestrator.current_preset().map(|p| p.name.as_str()),
            playing = self.orchestrator.is_playing(),
            unsaved = self.orchestrator.has_unsaved_changes(),
            angle = self.live.angle(),
            error = stats.error.as_deref(),
            "Telemetry"
        );
    }
}

/// Drive `session` until `shutdown` resolves, then stop it
///
/// Must run on a runtime whose clock the session's [`SharedClock`] follows
/// (see [`crate::scheduler::TokioClock`]).
pub async fn run_session<F>(session: &mut MotionSession, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        session.poll();
        let wake = match session.next_deadline() {
            Some(deadline) => tokio::time::Instant::from_std(deadline),
            None => tokio::time::Instant::now() + IDLE_WAIT,
        };
        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep_until(wake) => {}
        }
    }
    session.stop();
    tracing::info!("Motion session stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{DiscardSink, TestPatternSource};
    use crate::kernel::PassthroughKernel;
    use crate::params::FieldId;
    use crate::presets::{Preset, PRESETS_KEY};
    use crate::scheduler::{ManualClock, TokioClock};
    use crate::settings::SETTINGS_KEY;
    use crate::storage::{BlobStore, MemoryBlobStore};

    fn session(blobs: Rc<MemoryBlobStore>) -> (MotionSession, Rc<ManualClock>) {
        let clock = ManualClock::new();
        let options = SessionOptions {
            seed: Some(99),
            telemetry_interval: None,
            ..Default::default()
        };
        let session = MotionSession::new(
            clock.clone(),
            blobs,
            PassthroughKernel::factory(),
            &options,
        );
        (session, clock)
    }

    fn run_for(session: &mut MotionSession, clock: &ManualClock, ms: u64) {
        for _ in 0..ms / 16 {
            clock.advance_ms(16);
            session.poll();
        }
    }

    #[test]
    fn test_seeds_and_persists_builtins() {
        let blobs = Rc::new(MemoryBlobStore::new());
        let (session, _) = session(blobs.clone());
        assert_eq!(session.orchestrator().presets().len(), 4);
        assert!(blobs.get(PRESETS_KEY).unwrap().is_some());
    }

    #[test]
    fn test_unreadable_presets_are_not_overwritten() {
        let blobs = Rc::new(MemoryBlobStore::new());
        let mine = Preset::new("Mine", &ParameterSet::default(), None).unwrap();
        let mut broken = serde_json::to_value(&mine).unwrap();
        broken["id"] = "other".into();
        broken["createdAt"] = "not-a-date".into();
        let stored =
            serde_json::to_string(&vec![serde_json::to_value(&mine).unwrap(), broken]).unwrap();
        blobs.set(PRESETS_KEY, &stored).unwrap();

        let (session, _) = session(blobs.clone());
        assert_eq!(session.orchestrator().presets().len(), 4);
        assert_eq!(blobs.get(PRESETS_KEY).unwrap().as_deref(), Some(stored.as_str()));
    }

    #[test]
    fn test_loads_stored_settings() {
        let blobs = Rc::new(MemoryBlobStore::new());
        blobs
            .set(SETTINGS_KEY, r#"{"transitionDuration":500,"cycleDuration":"x"}"#)
            .unwrap();
        let (session, _) = session(blobs);
        assert_eq!(
            session.orchestrator().transition().duration(),
            Duration::from_millis(500)
        );
        assert_eq!(session.orchestrator().state().cycle_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_setting_changes_persist() {
        let blobs = Rc::new(MemoryBlobStore::new());
        let (mut session, _) = session(blobs.clone());
        session.set_transition_duration(Duration::from_millis(1_500));
        session.set_cycle_interval(Duration::from_millis(200));
        session.set_color_interval(Duration::from_millis(2_500));

        let stored = MotionSettings::load(&*blobs);
        assert_eq!(session.settings().color_interval(), Duration::from_millis(2_500));
        assert_eq!(session.next_deadline(), None);
        assert_eq!(stored.transition_duration, 1_500);
        assert_eq!(stored.cycle_duration, 1_000);
        assert_eq!(stored.color_interval_duration, 2_500);
        assert_eq!(session.settings(), stored);
    }

    #[test]
    fn test_poll_flags_manual_edits() {
        let blobs = Rc::new(MemoryBlobStore::new());
        let (mut session, clock) = session(blobs);
        let id = session.orchestrator().presets()[0].id.clone();
        session.orchestrator_mut().apply_preset(&id, true);
        run_for(&mut session, &clock, 2_200);
        assert!(!session.orchestrator().has_unsaved_changes());

        session.live().set_numeric(FieldId::MovementSpeed, 60.0);
        session.poll();
        assert!(session.orchestrator().has_unsaved_changes());
    }

    #[test]
    fn test_stopping_mid_fade_is_not_an_edit() {
        let blobs = Rc::new(MemoryBlobStore::new());
        let (mut session, clock) = session(blobs);
        session.start(
            Box::new(TestPatternSource::new(4, 4)),
            Box::new(DiscardSink::new()),
            true,
        );
        run_for(&mut session, &clock, 10_500);
        assert!(session.orchestrator().transition().is_transitioning());

        session.orchestrator_mut().stop_cycling();
        assert!(!session.orchestrator().has_unsaved_changes());
        run_for(&mut session, &clock, 32);
        assert!(!session.orchestrator().has_unsaved_changes());

        let speed = session.live().snapshot().movement_speed;
        session
            .live()
            .set_numeric(FieldId::MovementSpeed, if speed > 50.0 { 10.0 } else { 90.0 });
        session.poll();
        assert!(session.orchestrator().has_unsaved_changes());
    }

    #[test]
    fn test_drift_ignored_by_unsaved_check() {
        let blobs = Rc::new(MemoryBlobStore::new());
        let (mut session, clock) = session(blobs);
        let id = session.orchestrator().presets()[0].id.clone();
        session.orchestrator_mut().apply_preset(&id, false);
        session.start(
            Box::new(TestPatternSource::new(4, 4)),
            Box::new(DiscardSink::new()),
            false,
        );
        run_for(&mut session, &clock, 30_000);
        assert!(session.drift().glides_completed() > 0);
        assert!(!session.orchestrator().has_unsaved_changes());
        assert!(session.pacer().stats().frames_presented > 300);
    }

    #[test]
    fn test_stop_clears_deadlines() {
        let blobs = Rc::new(MemoryBlobStore::new());
        let (mut session, clock) = session(blobs);
        session.start(
            Box::new(TestPatternSource::new(4, 4)),
            Box::new(DiscardSink::new()),
            true,
        );
        run_for(&mut session, &clock, 1_000);
        session.stop();
        session.stop();
        assert_eq!(session.next_deadline(), None);
        assert!(!session.orchestrator().is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_runs_until_shutdown() {
        let blobs = Rc::new(MemoryBlobStore::new());
        let options = SessionOptions {
            seed: Some(5),
            ..Default::default()
        };
        let mut session = MotionSession::new(
            Rc::new(TokioClock),
            blobs,
            PassthroughKernel::factory(),
            &options,
        );
        session.start(
            Box::new(TestPatternSource::new(8, 8)),
            Box::new(DiscardSink::new()),
            true,
        );
        run_session(&mut session, tokio::time::sleep(Duration::from_secs(3))).await;

        let stats = session.pacer().stats();
        assert!(stats.frames_presented >= 55, "presented {}", stats.frames_presented);
        assert!(!session.pacer().is_running());
        assert!(session.orchestrator().state().current_preset_id.is_some());
        assert_eq!(session.next_deadline(), None);
    }
}
