//! End-to-end behaviour of presets, transitions, cycling and persistence

use std::rc::Rc;
use std::time::Duration;

use camera_motion::storage::SharedBlobStore;
use camera_motion::{
    Clock, DiscardSink, FileBlobStore, LiveParams, ManualClock, MotionSession, MoveType,
    ParameterSet, PassthroughKernel, PresetOrchestrator, PresetStore, SessionOptions,
    SharedClock, TestPatternSource, TransitionEngine,
};

fn orchestrator(live: &LiveParams, clock: &Rc<ManualClock>) -> PresetOrchestrator {
    let shared: SharedClock = clock.clone();
    let blobs: SharedBlobStore = Rc::new(camera_motion::MemoryBlobStore::new());
    let transition = TransitionEngine::new(live.clone(), shared.clone(), Duration::from_millis(1000));
    PresetOrchestrator::new(
        PresetStore::new(blobs),
        transition,
        live.clone(),
        shared,
        Duration::from_secs(10),
    )
    .with_seed(1)
}

#[test]
fn test_chained_preset_switch() {
    let clock = ManualClock::new();
    let live = LiveParams::new(ParameterSet {
        movement_angle: 200.0,
        ..Default::default()
    });
    let mut orch = orchestrator(&live, &clock);

    let a = orch
        .create_preset(
            "A",
            &ParameterSet {
                move_type: MoveType::Wave,
                wave_amplitude: 10.0,
                ..Default::default()
            },
            None,
        )
        .unwrap();
    let b = orch
        .create_preset(
            "B",
            &ParameterSet {
                move_type: MoveType::Direction,
                movement_angle: 90.0,
                ..Default::default()
            },
            None,
        )
        .unwrap();

    assert!(orch.apply_preset(&a, true));
    assert_eq!(live.snapshot().move_type, MoveType::Wave);
    orch.poll();
    for _ in 0..30 {
        clock.advance_ms(16);
        orch.poll();
    }
    assert!(orch.transition().is_transitioning());
    let at_switch = live.snapshot();
    assert!(at_switch.movement_angle > 90.0 && at_switch.movement_angle < 200.0);

    assert!(orch.apply_preset(&b, true));
    assert_eq!(live.snapshot().move_type, MoveType::Direction);
    orch.poll();
    assert_eq!(live.angle(), at_switch.movement_angle);
    assert_eq!(live.snapshot().wave_amplitude, at_switch.wave_amplitude);

    let mut previous = live.angle();
    while orch.transition().is_transitioning() {
        clock.advance_ms(16);
        orch.poll();
        let angle = live.angle();
        assert!(angle <= previous, "angle went back from {previous} to {angle}");
        assert!(previous - angle < 5.0, "jump from {previous} to {angle}");
        previous = angle;
    }
    assert_eq!(live.angle(), 90.0);
    assert_eq!(live.snapshot().wave_amplitude, 50.0);
    assert_eq!(orch.state().current_preset_id, Some(b));
}

#[test]
fn test_cycling_session_keeps_values_in_range() {
    let clock = ManualClock::new();
    let blobs: SharedBlobStore = Rc::new(camera_motion::MemoryBlobStore::new());
    let options = SessionOptions {
        seed: Some(2024),
        telemetry_interval: None,
        ..Default::default()
    };
    let mut session = MotionSession::new(clock.clone(), blobs, PassthroughKernel::factory(), &options);
    session.set_cycle_interval(Duration::from_secs(3));
    session.start(
        Box::new(TestPatternSource::new(4, 4)),
        Box::new(DiscardSink::new()),
        true,
    );

    let mut switches = 0;
    let mut current = session.orchestrator().state().current_preset_id.clone();
    for _ in 0..(60_000 / 16) {
        clock.advance_ms(16);
        session.poll();
        assert!(session.live().snapshot().is_in_range());
        assert!(!session.orchestrator().has_unsaved_changes());

        let now = session.orchestrator().state().current_preset_id.clone();
        if session.orchestrator().state().last_cycle_time == Some(clock.now()) {
            assert_ne!(now, current, "cycle re-selected the previous preset");
            switches += 1;
        }
        current = now;
    }
    assert!(switches >= 15, "only {switches} cycle steps");
    assert!(session.drift().is_running());
}

#[test]
fn test_presets_and_settings_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new();
    let options = SessionOptions {
        seed: Some(3),
        telemetry_interval: None,
        ..Default::default()
    };
    let open = || -> MotionSession {
        let blobs: SharedBlobStore = Rc::new(FileBlobStore::new(dir.path()));
        MotionSession::new(clock.clone(), blobs, PassthroughKernel::factory(), &options)
    };

    let (id, created_at) = {
        let mut session = open();
        let params = ParameterSet {
            move_type: MoveType::Spiral,
            rotation_speed: -2.0,
            ..Default::default()
        };
        let orch = session.orchestrator_mut();
        let id = orch.create_preset("Mine", &params, Some("notes")).unwrap();
        assert!(orch.reorder_presets(4, 0));
        let created_at = orch.get_preset(&id).unwrap().created_at;
        session.set_transition_duration(Duration::from_millis(750));
        session.set_cycle_interval(Duration::from_secs(3));
        (id, created_at)
    };

    let session = open();
    let presets = session.orchestrator().presets();
    assert_eq!(presets.len(), 5);
    assert_eq!(presets[0].id, id);
    assert_eq!(presets[0].name, "Mine");
    assert_eq!(presets[0].description.as_deref(), Some("notes"));
    assert_eq!(presets[0].options.rotation_speed, -2.0);
    assert_eq!(presets[0].created_at, created_at);
    assert_eq!(
        session.orchestrator().transition().duration(),
        Duration::from_millis(750)
    );
    assert_eq!(session.orchestrator().state().cycle_interval, Duration::from_secs(3));
}

#[test]
fn test_cycling_survives_empty_collection() {
    let clock = ManualClock::new();
    let live = LiveParams::default();
    let mut orch = orchestrator(&live, &clock);
    let only = orch
        .create_preset("Only", &ParameterSet::default(), None)
        .unwrap();
    orch.start_cycling();
    assert_eq!(orch.state().current_preset_id, Some(only.clone()));
    assert!(orch.delete_preset(&only));
    assert_eq!(orch.state().current_preset_id, None);

    clock.advance_ms(10_000);
    orch.poll();
    assert!(orch.is_playing());
    assert_eq!(orch.state().current_preset_id, None);
    assert_eq!(orch.time_until_next_cycle(), Duration::from_secs(10));
}
