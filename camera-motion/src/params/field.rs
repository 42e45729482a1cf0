//! Field catalogue for the motion parameter set
//!
//! Every field the kernel consumes is listed here once, with its valid range
//! and whether it is continuous (interpolated, clamped) or discrete (switched
//! atomically). Clamping, interpolation and unsaved-change comparison are all
//! driven from this table so a new field cannot be forgotten by one of them.

use std::fmt;

/// Valid range of a continuous field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRange {
    /// Inclusive lower bound
    pub min: f32,
    /// Upper bound (inclusive unless `wraps`)
    pub max: f32,
    /// Angular field: values wrap into `[min, max)` instead of saturating
    pub wraps: bool,
}

impl FieldRange {
    const fn closed(min: f32, max: f32) -> Self {
        Self { min, max, wraps: false }
    }

    const fn angular(max: f32) -> Self {
        Self { min: 0.0, max, wraps: true }
    }

    /// Bring a value back inside the range
    ///
    /// Non-finite input collapses to the lower bound.
    pub fn clamp(&self, value: f32) -> f32 {
        if !value.is_finite() {
            return self.min;
        }
        if self.wraps {
            let wrapped = value.rem_euclid(self.max);
            // rem_euclid can round up to exactly `max` for tiny negative inputs
            if wrapped >= self.max {
                self.min
            } else {
                wrapped
            }
        } else {
            value.clamp(self.min, self.max)
        }
    }

    /// Check whether a value already satisfies the range
    pub fn contains(&self, value: f32) -> bool {
        if self.wraps {
            value >= self.min && value < self.max
        } else {
            value >= self.min && value <= self.max
        }
    }
}

/// Whether a field is animated or switched
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Numeric field, linearly interpolated and clamped to its range
    Continuous(FieldRange),
    /// Enumerated field, never interpolated
    Discrete,
}

/// Identifier for every field of [`super::ParameterSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldId {
    MotionDecayRate,
    MovementAngle,
    MovementSpeed,
    MotionThreshold,
    Sensitivity,
    RotationSpeed,
    WaveAmplitude,
    WaveFrequency,
    WavePhase,
    MoveType,
    WaveAxis,
}

/// Lower bound for sensitivity, which is otherwise unbounded
pub const SENSITIVITY_MIN: f32 = 0.01;

impl FieldId {
    /// All fields in declaration order
    pub const ALL: [FieldId; 11] = [
        FieldId::MotionDecayRate,
        FieldId::MovementAngle,
        FieldId::MovementSpeed,
        FieldId::MotionThreshold,
        FieldId::Sensitivity,
        FieldId::RotationSpeed,
        FieldId::WaveAmplitude,
        FieldId::WaveFrequency,
        FieldId::WavePhase,
        FieldId::MoveType,
        FieldId::WaveAxis,
    ];

    /// Name used in persisted preset records
    pub fn name(self) -> &'static str {
        match self {
            FieldId::MotionDecayRate => "motionDecayRate",
            FieldId::MovementAngle => "movementAngle",
            FieldId::MovementSpeed => "movementSpeed",
            FieldId::MotionThreshold => "motionThreshold",
            FieldId::Sensitivity => "sensitivity",
            FieldId::RotationSpeed => "rotationSpeed",
            FieldId::WaveAmplitude => "waveAmplitude",
            FieldId::WaveFrequency => "waveFrequency",
            FieldId::WavePhase => "wavePhase",
            FieldId::MoveType => "moveType",
            FieldId::WaveAxis => "waveAxis",
        }
    }

    /// Range and interpolation behaviour of this field
    #[allow(clippy::approx_constant)]
    pub fn kind(self) -> FieldKind {
        match self {
            FieldId::MotionDecayRate => FieldKind::Continuous(FieldRange::closed(0.1, 0.99)),
            FieldId::MovementAngle => FieldKind::Continuous(FieldRange::angular(360.0)),
            FieldId::MovementSpeed => FieldKind::Continuous(FieldRange::closed(-30.0, 100.0)),
            FieldId::MotionThreshold => FieldKind::Continuous(FieldRange::closed(1.0, 100.0)),
            FieldId::Sensitivity => {
                FieldKind::Continuous(FieldRange::closed(SENSITIVITY_MIN, f32::MAX))
            }
            FieldId::RotationSpeed => FieldKind::Continuous(FieldRange::closed(-3.14, 3.14)),
            FieldId::WaveAmplitude => FieldKind::Continuous(FieldRange::closed(0.0, 500.0)),
            FieldId::WaveFrequency => FieldKind::Continuous(FieldRange::closed(0.001, 2.0)),
            FieldId::WavePhase => FieldKind::Continuous(FieldRange::closed(0.0, 6.28)),
            FieldId::MoveType | FieldId::WaveAxis => FieldKind::Discrete,
        }
    }

    /// Range of a continuous field, `None` for discrete fields
    pub fn range(self) -> Option<FieldRange> {
        match self.kind() {
            FieldKind::Continuous(range) => Some(range),
            FieldKind::Discrete => None,
        }
    }

    /// Check if the field switches atomically
    pub fn is_discrete(self) -> bool {
        matches!(self.kind(), FieldKind::Discrete)
    }

    /// Iterate over the continuous fields only
    pub fn continuous() -> impl Iterator<Item = FieldId> {
        Self::ALL.into_iter().filter(|f| !f.is_discrete())
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_wraps_into_range() {
        let range = FieldId::MovementAngle.range().unwrap();
        assert_eq!(range.clamp(370.0), 10.0);
        assert_eq!(range.clamp(-90.0), 270.0);
        assert_eq!(range.clamp(360.0), 0.0);
        assert!(range.contains(range.clamp(-1e-7)));
    }

    #[test]
    fn test_closed_range_saturates() {
        let range = FieldId::MotionDecayRate.range().unwrap();
        assert_eq!(range.clamp(2.0), 0.99);
        assert_eq!(range.clamp(0.0), 0.1);
        assert_eq!(range.clamp(f32::NAN), 0.1);
    }

    #[test]
    fn test_discrete_fields() {
        let discrete: Vec<_> = FieldId::ALL.iter().filter(|f| f.is_discrete()).collect();
        assert_eq!(discrete, vec![&FieldId::MoveType, &FieldId::WaveAxis]);
        assert_eq!(FieldId::continuous().count(), 9);
    }
}
