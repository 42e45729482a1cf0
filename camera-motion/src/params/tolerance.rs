//! Per-field comparison policy for unsaved-change detection
//!
//! Slider UIs and transition rounding leave small residues in continuous
//! fields, so "changed" means "moved further than the slider step". The
//! tolerances mirror the UI step sizes; if those change, update this table
//! together with them.

use std::collections::BTreeMap;

use thiserror::Error;

use super::{FieldId, ParameterSet};

/// How a single field is compared against the last applied preset
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ComparePolicy {
    /// Never counts as a change (animated independently of presets)
    Ignore,
    /// Changed when the absolute difference exceeds the value
    Tolerance(f32),
    /// Changed on any difference
    Exact,
}

/// Errors from validating a tolerance table
#[derive(Debug, Error, PartialEq)]
pub enum ToleranceError {
    #[error("no comparison policy for field '{0}'")]
    MissingField(FieldId),
    #[error("discrete field '{0}' must be compared exactly")]
    InexactDiscrete(FieldId),
    #[error("tolerance for field '{0}' must be finite and non-negative")]
    InvalidTolerance(FieldId),
}

/// Declarative map from field to comparison policy
///
/// Built once and validated against [`FieldId::ALL`], so a field added to the
/// parameter set without a policy is rejected at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ToleranceTable {
    policies: BTreeMap<FieldId, ComparePolicy>,
}

impl ToleranceTable {
    /// Build and validate a table from explicit entries
    pub fn new(
        entries: impl IntoIterator<Item = (FieldId, ComparePolicy)>,
    ) -> Result<Self, ToleranceError> {
        let table = Self {
            policies: entries.into_iter().collect(),
        };
        table.validate()?;
        Ok(table)
    }

    /// Table matching the control panel slider steps
    pub fn slider_defaults() -> Self {
        Self {
            policies: BTreeMap::from([
                (FieldId::MovementAngle, ComparePolicy::Ignore),
                (FieldId::MotionDecayRate, ComparePolicy::Tolerance(0.01)),
                (FieldId::WaveFrequency, ComparePolicy::Tolerance(0.01)),
                (FieldId::RotationSpeed, ComparePolicy::Tolerance(0.05)),
                (FieldId::WavePhase, ComparePolicy::Tolerance(0.05)),
                (FieldId::Sensitivity, ComparePolicy::Tolerance(0.05)),
                (FieldId::MovementSpeed, ComparePolicy::Tolerance(1.0)),
                (FieldId::WaveAmplitude, ComparePolicy::Tolerance(1.0)),
                (FieldId::MotionThreshold, ComparePolicy::Tolerance(1.0)),
                (FieldId::MoveType, ComparePolicy::Exact),
                (FieldId::WaveAxis, ComparePolicy::Exact),
            ]),
        }
    }

    /// Check that every field has a policy and discrete fields are exact
    pub fn validate(&self) -> Result<(), ToleranceError> {
        for field in FieldId::ALL {
            let policy = self
                .policies
                .get(&field)
                .ok_or(ToleranceError::MissingField(field))?;
            match policy {
                ComparePolicy::Exact => {}
                _ if field.is_discrete() => return Err(ToleranceError::InexactDiscrete(field)),
                ComparePolicy::Tolerance(tol) if !tol.is_finite() || *tol < 0.0 => {
                    return Err(ToleranceError::InvalidTolerance(field));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Policy for a field
    pub fn policy(&self, field: FieldId) -> ComparePolicy {
        self.policies
            .get(&field)
            .copied()
            .unwrap_or(ComparePolicy::Exact)
    }

    /// Fields whose difference between `applied` and `live` exceeds policy
    pub fn changed_fields(&self, applied: &ParameterSet, live: &ParameterSet) -> Vec<FieldId> {
        FieldId::ALL
            .into_iter()
            .filter(|field| self.field_changed(*field, applied, live))
            .collect()
    }

    /// Check if any field differs beyond its policy
    pub fn differs(&self, applied: &ParameterSet, live: &ParameterSet) -> bool {
        FieldId::ALL
            .into_iter()
            .any(|field| self.field_changed(field, applied, live))
    }

    fn field_changed(&self, field: FieldId, applied: &ParameterSet, live: &ParameterSet) -> bool {
        match self.policy(field) {
            ComparePolicy::Ignore => false,
            ComparePolicy::Exact => !applied.field_eq(live, field),
            ComparePolicy::Tolerance(tol) => match (applied.numeric(field), live.numeric(field)) {
                (Some(a), Some(b)) => (a - b).abs() > tol,
                _ => !applied.field_eq(live, field),
            },
        }
    }
}

impl Default for ToleranceTable {
    fn default() -> Self {
        Self::slider_defaults()
    }
}
