//! Preset orchestration
//!
//! Owns the preset collection and the transition engine, and decides what
//! the live parameters should be heading towards: manual selection,
//! autonomous cycling, edit mode, and detection of unsaved drift away from
//! the last applied preset.
//!
//! State machine:
//!
//! ```text
//! Idle ──start_cycling──▶ Cycling ──stop_cycling──▶ Idle
//! Idle/Cycling ──start_editing_preset──▶ Editing ──save/cancel──▶ Idle
//! ```
//!
//! Cycling and Editing are mutually exclusive; entering Editing from Cycling
//! stops cycling first.

use std::rc::Rc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{
    builtin_presets, Preset, PresetError, PresetId, PresetStore, PresetUpdate, StoredPresets,
};
use crate::params::{LiveParams, ParameterSet, ToleranceTable};
use crate::scheduler::{earliest, ScheduledTask, SharedClock};
use crate::transition::TransitionEngine;

/// Shortest allowed cycle interval
pub const MIN_CYCLE_INTERVAL: Duration = Duration::from_millis(1000);

/// Observable orchestrator state
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorState {
    /// Preset the live values were last set from (weak reference by id)
    pub current_preset_id: Option<PresetId>,
    /// Whether autonomous cycling is on
    pub is_playing: bool,
    /// Whether a preset is open for editing
    pub is_editing_preset: bool,
    /// Preset being edited
    pub editing_preset_id: Option<PresetId>,
    /// When the last cycle step ran
    pub last_cycle_time: Option<Instant>,
    /// Time between cycle steps
    pub cycle_interval: Duration,
    /// Whether the live values have drifted from the applied preset
    pub has_unsaved_changes: bool,
    /// Copy of the applied preset's values, for drift comparison only
    pub last_applied_options: Option<ParameterSet>,
}

impl OrchestratorState {
    fn new(cycle_interval: Duration) -> Self {
        Self {
            current_preset_id: None,
            is_playing: false,
            is_editing_preset: false,
            editing_preset_id: None,
            last_cycle_time: None,
            cycle_interval: cycle_interval.max(MIN_CYCLE_INTERVAL),
            has_unsaved_changes: false,
            last_applied_options: None,
        }
    }
}

/// Stateful controller tying presets, cycling and transitions together
pub struct PresetOrchestrator {
    store: PresetStore,
    presets: Rc<Vec<Preset>>,
    revision: u64,
    stored_unreadable: bool,
    transition: TransitionEngine,
    live: LiveParams,
    clock: SharedClock,
    rng: StdRng,
    tolerances: ToleranceTable,
    state: OrchestratorState,
    cycle_task: ScheduledTask,
}

impl PresetOrchestrator {
    /// Create an orchestrator, loading the stored collection
    pub fn new(
        store: PresetStore,
        transition: TransitionEngine,
        live: LiveParams,
        clock: SharedClock,
        cycle_interval: Duration,
    ) -> Self {
        let stored = store.read();
        let stored_unreadable = stored == StoredPresets::Unreadable;
        let presets = stored.into_presets();
        tracing::info!(count = presets.len(), "Preset orchestrator ready");
        Self {
            store,
            presets: Rc::new(presets),
            revision: 0,
            stored_unreadable,
            transition,
            live,
            clock,
            rng: StdRng::from_os_rng(),
            tolerances: ToleranceTable::default(),
            state: OrchestratorState::new(cycle_interval),
            cycle_task: ScheduledTask::new(),
        }
    }

    /// Use a seeded RNG for cycle selection
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Use a custom unsaved-change tolerance table
    pub fn with_tolerances(mut self, tolerances: ToleranceTable) -> Self {
        self.tolerances = tolerances;
        self
    }

    // ========== Accessors ==========

    /// Shared snapshot of the ordered collection
    ///
    /// Every mutation installs a new `Rc`, so `Rc::ptr_eq` detects changes.
    pub fn presets(&self) -> Rc<Vec<Preset>> {
        Rc::clone(&self.presets)
    }

    /// Counter bumped on every collection change
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Look up a preset by id
    pub fn get_preset(&self, id: &PresetId) -> Option<&Preset> {
        self.presets.iter().find(|p| &p.id == id)
    }

    /// The preset the live values were last set from
    pub fn current_preset(&self) -> Option<&Preset> {
        self.state
            .current_preset_id
            .as_ref()
            .and_then(|id| self.get_preset(id))
    }

    /// Observable state
    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    /// Check if cycling is on
    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    /// Check if a preset is open for editing
    pub fn is_editing(&self) -> bool {
        self.state.is_editing_preset
    }

    /// Latest result of [`Self::check_for_unsaved_changes`]
    pub fn has_unsaved_changes(&self) -> bool {
        self.state.has_unsaved_changes
    }

    /// The transition engine
    pub fn transition(&self) -> &TransitionEngine {
        &self.transition
    }

    /// Mutable access to the transition engine
    pub fn transition_mut(&mut self) -> &mut TransitionEngine {
        &mut self.transition
    }

    // ========== Collection ==========

    /// Seed the built-in presets if the collection is empty
    ///
    /// If the stored collection could not be read the built-ins are only
    /// held in memory; the stored blob is left alone until the next explicit
    /// change to the collection.
    pub fn seed_builtin_presets_if_empty(&mut self) -> bool {
        if !self.presets.is_empty() {
            return false;
        }
        if self.stored_unreadable {
            tracing::warn!("Stored presets unreadable, using built-ins without saving");
            self.presets = Rc::new(builtin_presets());
            self.revision += 1;
            return true;
        }
        tracing::info!("No stored presets, seeding built-ins");
        self.commit(builtin_presets());
        true
    }

    /// Snapshot `params` into a new preset appended to the collection
    pub fn create_preset(
        &mut self,
        name: &str,
        params: &ParameterSet,
        description: Option<&str>,
    ) -> Result<PresetId, PresetError> {
        let preset = Preset::new(name, params, description)?;
        let id = preset.id.clone();
        tracing::info!(id = %id, name = %preset.name, "Preset created");
        let mut presets = self.presets.as_ref().clone();
        presets.push(preset);
        self.commit(presets);
        Ok(id)
    }

    /// Merge `update` into a preset; false if the id is unknown or the name blank
    pub fn update_preset(&mut self, id: &PresetId, update: PresetUpdate) -> bool {
        let Some(index) = self.index_of(id) else {
            tracing::debug!(id = %id, "Update of unknown preset ignored");
            return false;
        };
        let mut presets = self.presets.as_ref().clone();
        if !presets[index].apply_update(&update) {
            return false;
        }
        tracing::info!(id = %id, "Preset updated");
        self.commit(presets);
        true
    }

    /// Rename a preset (trimmed, must not be blank)
    pub fn rename_preset(&mut self, id: &PresetId, name: &str) -> bool {
        self.update_preset(id, PresetUpdate::name(name))
    }

    /// Remove a preset, clearing any reference to it
    pub fn delete_preset(&mut self, id: &PresetId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let mut presets = self.presets.as_ref().clone();
        let removed = presets.remove(index);
        tracing::info!(id = %id, name = %removed.name, "Preset deleted");

        if self.state.current_preset_id.as_ref() == Some(id) {
            self.state.current_preset_id = None;
            self.state.last_applied_options = None;
            self.state.has_unsaved_changes = false;
        }
        if self.state.editing_preset_id.as_ref() == Some(id) {
            self.state.is_editing_preset = false;
            self.state.editing_preset_id = None;
        }
        self.commit(presets);
        true
    }

    /// Move the preset at `from` to position `to`
    ///
    /// Equal or out-of-range indices leave the collection untouched.
    pub fn reorder_presets(&mut self, from: usize, to: usize) -> bool {
        let len = self.presets.len();
        if from == to || from >= len || to >= len {
            return false;
        }
        let mut presets = self.presets.as_ref().clone();
        let moved = presets.remove(from);
        presets.insert(to, moved);
        self.commit(presets);
        true
    }

    // ========== Applying ==========

    /// Make a preset current, fading or jumping the live values to it
    ///
    /// Manual selection and cycling both go through here.
    pub fn apply_preset(&mut self, id: &PresetId, use_transition: bool) -> bool {
        let Some(preset) = self.get_preset(id).cloned() else {
            tracing::debug!(id = %id, "Apply of unknown preset ignored");
            return false;
        };

        self.state.current_preset_id = Some(preset.id.clone());
        self.state.last_applied_options = Some(preset.options.clone());
        self.state.has_unsaved_changes = false;

        if use_transition {
            let from = self.live.snapshot();
            self.transition.start_transition(&from, &preset.options);
        } else {
            self.transition.apply_immediately(&preset.options);
        }
        tracing::info!(id = %preset.id, name = %preset.name, use_transition, "Preset applied");
        true
    }

    /// Snapshot `params` into a new preset and make it current
    pub fn create_preset_from_current(
        &mut self,
        name: &str,
        params: &ParameterSet,
    ) -> Result<PresetId, PresetError> {
        let id = self.create_preset(name, params, None)?;
        self.state.current_preset_id = Some(id.clone());
        self.state.last_applied_options = self.get_preset(&id).map(|p| p.options.clone());
        self.state.has_unsaved_changes = false;
        Ok(id)
    }

    /// Re-apply the current preset without a transition
    pub fn discard_changes(&mut self) -> bool {
        match self.state.current_preset_id.clone() {
            Some(id) => self.apply_preset(&id, false),
            None => false,
        }
    }

    /// Compare the live values against the last applied preset
    ///
    /// Always false while cycling, since every interpolated frame differs
    /// from the preset being faded to.
    pub fn check_for_unsaved_changes(&mut self, live: &ParameterSet) -> bool {
        let changed = match (&self.state.last_applied_options, self.state.is_playing) {
            (_, true) | (None, _) => false,
            (Some(applied), false) => self.tolerances.differs(applied, live),
        };
        if changed && !self.state.has_unsaved_changes {
            tracing::debug!(
                fields = ?self
                    .state
                    .last_applied_options
                    .as_ref()
                    .map(|applied| self.tolerances.changed_fields(applied, live)),
                "Live values diverged from preset"
            );
        }
        self.state.has_unsaved_changes = changed;
        changed
    }

    // ========== Cycling ==========

    /// Turn cycling on, applying a random preset immediately
    pub fn start_cycling(&mut self) {
        if self.state.is_playing {
            return;
        }
        if self.state.is_editing_preset {
            self.cancel_editing_preset();
        }
        self.state.is_playing = true;
        tracing::info!(
            interval_ms = self.state.cycle_interval.as_millis() as u64,
            "Cycling started"
        );
        self.cycle_to_next();
    }

    /// Turn cycling off, cancelling any in-flight transition
    pub fn stop_cycling(&mut self) {
        self.cycle_task.cancel();
        if !self.state.is_playing {
            return;
        }
        self.state.is_playing = false;
        self.cancel_transition();
        self.state.has_unsaved_changes = false;
        tracing::info!("Cycling stopped");
    }

    /// Stop a running transition where it is
    ///
    /// The values left behind by the interrupted fade become the baseline
    /// for unsaved-change detection, so they are not reported as edits.
    pub fn cancel_transition(&mut self) {
        if !self.transition.is_transitioning() {
            return;
        }
        self.transition.cancel_transition();
        if self.state.last_applied_options.is_some() {
            self.state.last_applied_options = Some(self.live.snapshot());
        }
        self.state.has_unsaved_changes = false;
    }

    /// Apply the next preset chosen by the cycle policy and re-arm the timer
    ///
    /// With one preset it is re-applied; with more, the current preset is
    /// excluded and the next is picked uniformly from the rest.
    pub fn cycle_to_next(&mut self) {
        let now = self.clock.now();
        self.state.last_cycle_time = Some(now);
        if self.state.is_playing {
            self.cycle_task.arm_after(now, self.state.cycle_interval);
        }

        let current = self.state.current_preset_id.as_ref();
        let candidates: Vec<&PresetId> = match self.presets.len() {
            0 => return,
            1 => self.presets.iter().map(|p| &p.id).collect(),
            _ => self
                .presets
                .iter()
                .map(|p| &p.id)
                .filter(|id| Some(*id) != current)
                .collect(),
        };
        if candidates.is_empty() {
            return;
        }
        let pick = self.rng.random_range(0..candidates.len());
        let id = candidates[pick].clone();
        self.apply_preset(&id, true);
    }

    /// Change the time between cycle steps (minimum 1s)
    pub fn set_cycle_interval(&mut self, interval: Duration) {
        self.state.cycle_interval = interval.max(MIN_CYCLE_INTERVAL);
        if self.state.is_playing {
            let base = self.state.last_cycle_time.unwrap_or_else(|| self.clock.now());
            self.cycle_task.arm_at(base + self.state.cycle_interval);
        }
    }

    /// Time until the next cycle step, zero when not cycling
    pub fn time_until_next_cycle(&self) -> Duration {
        if !self.state.is_playing {
            return Duration::ZERO;
        }
        let Some(last) = self.state.last_cycle_time else {
            return Duration::ZERO;
        };
        let elapsed = self.clock.now().saturating_duration_since(last);
        self.state.cycle_interval.saturating_sub(elapsed)
    }

    // ========== Editing ==========

    /// Open a preset for editing, stopping cycling and showing its literal values
    pub fn start_editing_preset(&mut self, id: &PresetId) -> bool {
        if self.get_preset(id).is_none() {
            return false;
        }
        if self.state.is_playing {
            self.stop_cycling();
        }
        self.state.is_editing_preset = true;
        self.state.editing_preset_id = Some(id.clone());
        tracing::debug!(id = %id, "Editing preset");
        self.apply_preset(id, false)
    }

    /// Write `params` into the preset being edited and leave edit mode
    pub fn save_editing_preset(&mut self, params: &ParameterSet) -> bool {
        let Some(id) = self.finish_editing() else {
            return false;
        };
        if !self.update_preset(&id, PresetUpdate::options(params)) {
            return false;
        }
        self.state.current_preset_id = Some(id.clone());
        self.state.last_applied_options = self.get_preset(&id).map(|p| p.options.clone());
        self.state.has_unsaved_changes = false;
        true
    }

    /// Leave edit mode, restoring the edited preset's stored values
    pub fn cancel_editing_preset(&mut self) {
        if let Some(id) = self.finish_editing() {
            self.apply_preset(&id, false);
        }
    }

    // ========== Scheduling ==========

    /// Run due transition steps and cycle steps; returns true if anything ran
    pub fn poll(&mut self) -> bool {
        let mut ran = self.transition.poll();
        let now = self.clock.now();
        if self.cycle_task.fire_if_due(now) {
            if self.state.is_playing {
                self.cycle_to_next();
            }
            ran = true;
        }
        ran
    }

    /// When the orchestrator next needs polling
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest([self.transition.next_deadline(), self.cycle_task.deadline()])
    }

    fn finish_editing(&mut self) -> Option<PresetId> {
        if !self.state.is_editing_preset {
            return None;
        }
        self.state.is_editing_preset = false;
        self.state.editing_preset_id.take()
    }

    fn index_of(&self, id: &PresetId) -> Option<usize> {
        self.presets.iter().position(|p| &p.id == id)
    }

    fn commit(&mut self, presets: Vec<Preset>) {
        self.presets = Rc::new(presets);
        self.revision += 1;
        self.store.save(&self.presets);
    }
}
