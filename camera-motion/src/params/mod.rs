//! Motion parameter set
//!
//! The value object the external kernel is parameterized with. One live
//! instance is shared by every component through [`LiveParams`]; presets own
//! independent copies.

pub mod field;
pub mod live;
pub mod tolerance;

use serde::{Deserialize, Serialize};

pub use field::{FieldId, FieldKind, FieldRange};
pub use live::{AngleWriter, LiveParams};
pub use tolerance::{ComparePolicy, ToleranceError, ToleranceTable};

/// How detected motion is displaced across the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MoveType {
    /// Shift along `movement_angle`
    #[default]
    Direction,
    /// Push outward from the frame centre
    Radial,
    /// Rotate around the frame centre
    Spiral,
    /// Sinusoidal displacement along `wave_axis`
    Wave,
}

impl MoveType {
    /// Get display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            MoveType::Direction => "Direction",
            MoveType::Radial => "Radial",
            MoveType::Spiral => "Spiral",
            MoveType::Wave => "Wave",
        }
    }
}

/// Axis the wave displacement travels along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WaveAxis {
    #[default]
    Horizontal,
    Vertical,
}

/// One point in the effect's configuration space
///
/// Missing fields in persisted records fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParameterSet {
    /// Persistence decay per frame (0.1-0.99)
    pub motion_decay_rate: f32,
    /// Direction of travel in degrees [0, 360)
    pub movement_angle: f32,
    /// Displacement speed (-30 to 100)
    pub movement_speed: f32,
    /// Minimum pixel difference counted as motion (1-100)
    pub motion_threshold: f32,
    /// Gain applied to the difference signal (positive, unbounded)
    pub sensitivity: f32,
    /// Spiral rotation speed in radians per frame (-3.14 to 3.14)
    pub rotation_speed: f32,
    /// Wave displacement in pixels (0-500)
    pub wave_amplitude: f32,
    /// Wave spatial frequency (0.001-2)
    pub wave_frequency: f32,
    /// Wave phase offset in radians (0-6.28)
    pub wave_phase: f32,
    /// Displacement mode
    pub move_type: MoveType,
    /// Wave axis
    pub wave_axis: WaveAxis,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            motion_decay_rate: 0.85,
            movement_angle: 0.0,
            movement_speed: 10.0,
            motion_threshold: 30.0,
            sensitivity: 1.0,
            rotation_speed: 0.5,
            wave_amplitude: 50.0,
            wave_frequency: 0.05,
            wave_phase: 0.0,
            move_type: MoveType::Direction,
            wave_axis: WaveAxis::Horizontal,
        }
    }
}

impl ParameterSet {
    /// Read a continuous field, `None` for discrete fields
    pub fn numeric(&self, field: FieldId) -> Option<f32> {
        let value = match field {
            FieldId::MotionDecayRate => self.motion_decay_rate,
            FieldId::MovementAngle => self.movement_angle,
            FieldId::MovementSpeed => self.movement_speed,
            FieldId::MotionThreshold => self.motion_threshold,
            FieldId::Sensitivity => self.sensitivity,
            FieldId::RotationSpeed => self.rotation_speed,
            FieldId::WaveAmplitude => self.wave_amplitude,
            FieldId::WaveFrequency => self.wave_frequency,
            FieldId::WavePhase => self.wave_phase,
            FieldId::MoveType | FieldId::WaveAxis => return None,
        };
        Some(value)
    }

    /// Write a continuous field, clamped to its declared range
    ///
    /// Writes to discrete fields are ignored.
    pub fn set_numeric(&mut self, field: FieldId, value: f32) {
        let Some(range) = field.range() else {
            return;
        };
        let value = range.clamp(value);
        match field {
            FieldId::MotionDecayRate => self.motion_decay_rate = value,
            FieldId::MovementAngle => self.movement_angle = value,
            FieldId::MovementSpeed => self.movement_speed = value,
            FieldId::MotionThreshold => self.motion_threshold = value,
            FieldId::Sensitivity => self.sensitivity = value,
            FieldId::RotationSpeed => self.rotation_speed = value,
            FieldId::WaveAmplitude => self.wave_amplitude = value,
            FieldId::WaveFrequency => self.wave_frequency = value,
            FieldId::WavePhase => self.wave_phase = value,
            FieldId::MoveType | FieldId::WaveAxis => {}
        }
    }

    /// Compare a field between two sets with exact equality
    pub fn field_eq(&self, other: &ParameterSet, field: FieldId) -> bool {
        match field {
            FieldId::MoveType => self.move_type == other.move_type,
            FieldId::WaveAxis => self.wave_axis == other.wave_axis,
            _ => self.numeric(field) == other.numeric(field),
        }
    }

    /// Clamp every continuous field into its range in place
    pub fn clamp_all(&mut self) {
        for field in FieldId::continuous() {
            if let Some(value) = self.numeric(field) {
                self.set_numeric(field, value);
            }
        }
    }

    /// Consume and return a copy with every field in range
    pub fn clamped(mut self) -> Self {
        self.clamp_all();
        self
    }

    /// Check that every continuous field is inside its range
    pub fn is_in_range(&self) -> bool {
        FieldId::continuous().all(|field| {
            match (field.range(), self.numeric(field)) {
                (Some(range), Some(value)) => range.contains(value),
                _ => true,
            }
        })
    }

    /// Copy the discrete fields of `other` into this set
    pub fn take_discrete(&mut self, other: &ParameterSet) {
        self.move_type = other.move_type;
        self.wave_axis = other.wave_axis;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_in_range() {
        assert!(ParameterSet::default().is_in_range());
    }

    #[test]
    #[allow(clippy::approx_constant)]
    fn test_set_numeric_clamps() {
        let mut params = ParameterSet::default();
        params.set_numeric(FieldId::WaveAmplitude, 900.0);
        params.set_numeric(FieldId::RotationSpeed, -10.0);
        params.set_numeric(FieldId::MovementAngle, 725.0);
        assert_eq!(params.wave_amplitude, 500.0);
        assert_eq!(params.rotation_speed, -3.14);
        assert_eq!(params.movement_angle, 5.0);
    }

    #[test]
    fn test_clamped_repairs_out_of_range_record() {
        let params = ParameterSet {
            motion_decay_rate: 5.0,
            sensitivity: -1.0,
            wave_frequency: 0.0,
            ..Default::default()
        }
        .clamped();
        assert!(params.is_in_range());
        assert_eq!(params.motion_decay_rate, 0.99);
        assert_eq!(params.sensitivity, field::SENSITIVITY_MIN);
    }

    #[test]
    fn test_serde_names_and_missing_fields() {
        let json = r#"{"moveType":"wave","waveAmplitude":10,"waveAxis":"vertical"}"#;
        let params: ParameterSet = serde_json::from_str(json).unwrap();
        assert_eq!(params.move_type, MoveType::Wave);
        assert_eq!(params.wave_axis, WaveAxis::Vertical);
        assert_eq!(params.wave_amplitude, 10.0);
        assert_eq!(params.motion_decay_rate, ParameterSet::default().motion_decay_rate);

        let value = serde_json::to_value(ParameterSet::default()).unwrap();
        for field in FieldId::ALL {
            assert!(value.get(field.name()).is_some(), "missing {}", field);
        }
    }
}
