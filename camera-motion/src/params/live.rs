//! Shared handle to the one live parameter set
//!
//! Everything runs on one thread, so the live set is an `Rc<RefCell<_>>`
//! handed to each component. Field ownership is enforced for the one field
//! two writers animate, the movement angle:
//!
//! - the transition engine leases the angle while a transition runs;
//! - every write that does not come from the drift generator bumps an epoch;
//! - the drift generator only writes while the lease is free and the epoch it
//!   started its segment with is still current.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{FieldId, ParameterSet};

#[derive(Debug, Default)]
struct LiveState {
    params: RefCell<ParameterSet>,
    angle_leased: Cell<bool>,
    angle_epoch: Cell<u64>,
}

/// Token a drift segment holds while animating the angle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AngleWriter {
    epoch: u64,
}

/// Cloneable handle to the live parameter set
#[derive(Debug, Clone, Default)]
pub struct LiveParams {
    state: Rc<LiveState>,
}

impl LiveParams {
    /// Create a live set starting from `initial` (clamped)
    pub fn new(initial: ParameterSet) -> Self {
        Self {
            state: Rc::new(LiveState {
                params: RefCell::new(initial.clamped()),
                angle_leased: Cell::new(false),
                angle_epoch: Cell::new(0),
            }),
        }
    }

    /// Copy of the current values
    pub fn snapshot(&self) -> ParameterSet {
        self.state.params.borrow().clone()
    }

    /// Run a closure against the current values without copying
    pub fn with<R>(&self, f: impl FnOnce(&ParameterSet) -> R) -> R {
        f(&self.state.params.borrow())
    }

    /// Current movement angle
    pub fn angle(&self) -> f32 {
        self.state.params.borrow().movement_angle
    }

    /// Overwrite every field (clamped)
    pub fn replace(&self, params: &ParameterSet) {
        *self.state.params.borrow_mut() = params.clone().clamped();
        self.bump_epoch();
    }

    /// Overwrite only the discrete fields
    pub fn set_discrete(&self, params: &ParameterSet) {
        self.state.params.borrow_mut().take_discrete(params);
    }

    /// Write one continuous field on behalf of a non-drift writer
    pub fn set_numeric(&self, field: FieldId, value: f32) {
        self.state.params.borrow_mut().set_numeric(field, value);
        if field == FieldId::MovementAngle {
            self.bump_epoch();
        }
    }

    /// Take the angle away from the drift generator
    pub fn lease_angle(&self) {
        self.state.angle_leased.set(true);
        self.bump_epoch();
    }

    /// Hand the angle back to the drift generator
    pub fn release_angle(&self) {
        self.state.angle_leased.set(false);
    }

    /// Check if a transition currently owns the angle
    pub fn is_angle_leased(&self) -> bool {
        self.state.angle_leased.get()
    }

    /// Start a drift segment, `None` while the angle is leased
    pub fn begin_drift(&self) -> Option<AngleWriter> {
        if self.is_angle_leased() {
            return None;
        }
        Some(AngleWriter {
            epoch: self.state.angle_epoch.get(),
        })
    }

    /// Write the angle from a drift segment
    ///
    /// Returns false (and writes nothing) if another writer touched the angle
    /// since the segment began or currently holds the lease.
    pub fn write_drift_angle(&self, writer: AngleWriter, angle: f32) -> bool {
        if self.is_angle_leased() || writer.epoch != self.state.angle_epoch.get() {
            return false;
        }
        self.state
            .params
            .borrow_mut()
            .set_numeric(FieldId::MovementAngle, angle);
        true
    }

    fn bump_epoch(&self) {
        let epoch = self.state.angle_epoch.get();
        self.state.angle_epoch.set(epoch.wrapping_add(1));
    }
}
