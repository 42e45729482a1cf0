//! Motion presets
//!
//! A preset is a named, persisted snapshot of a [`ParameterSet`]. The
//! [`PresetStore`] reads and writes the ordered collection; the
//! [`PresetOrchestrator`] owns it at runtime and decides which preset the
//! live parameters should be heading towards.

pub mod orchestrator;
pub mod store;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::params::{MoveType, ParameterSet, WaveAxis};

pub use orchestrator::{OrchestratorState, PresetOrchestrator};
pub use store::{PresetStore, StoredPresets, PRESETS_KEY};

// ═══════════════════════════════════════════════════════════════════════════════
// PRESET - Named parameter snapshot
// ═══════════════════════════════════════════════════════════════════════════════

/// Opaque, stable preset identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetId(String);

impl PresetId {
    /// Generate a fresh unique id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PresetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PresetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PresetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Preset-related errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PresetError {
    #[error("preset name must not be empty")]
    EmptyName,
}

/// A named snapshot of motion parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    /// Identity, stable for the preset's lifetime
    pub id: PresetId,
    /// Trimmed, non-empty display name
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Owned copy of the parameters
    pub options: ParameterSet,
    /// When the preset was created
    pub created_at: DateTime<Utc>,
    /// When the preset was last changed
    pub updated_at: DateTime<Utc>,
}

impl Preset {
    /// Create a preset with a fresh id from a copy of `options`
    pub fn new(
        name: &str,
        options: &ParameterSet,
        description: Option<&str>,
    ) -> Result<Self, PresetError> {
        let name = normalize_name(name).ok_or(PresetError::EmptyName)?;
        let now = Utc::now();
        Ok(Self {
            id: PresetId::generate(),
            name,
            description: normalize_description(description),
            options: options.clone().clamped(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Merge a partial update, refreshing `updated_at`
    ///
    /// Returns false (leaving the preset untouched) if the new name is blank.
    pub fn apply_update(&mut self, update: &PresetUpdate) -> bool {
        let name = match update.name.as_deref() {
            Some(raw) => match normalize_name(raw) {
                Some(name) => Some(name),
                None => return false,
            },
            None => None,
        };
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = &update.description {
            self.description = normalize_description(description.as_deref());
        }
        if let Some(options) = &update.options {
            self.options = options.clone().clamped();
        }
        self.updated_at = Utc::now();
        true
    }
}

/// Partial preset update; `None` leaves a field as it is
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetUpdate {
    /// New name (trimmed, must not be blank)
    pub name: Option<String>,
    /// New description; `Some(None)` clears it
    pub description: Option<Option<String>>,
    /// New parameters
    pub options: Option<ParameterSet>,
}

impl PresetUpdate {
    /// Update only the name
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Update only the parameters
    pub fn options(options: &ParameterSet) -> Self {
        Self {
            options: Some(options.clone()),
            ..Default::default()
        }
    }
}

fn normalize_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn normalize_description(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Built-in Presets
// ═══════════════════════════════════════════════════════════════════════════════

/// Presets seeded into an empty collection, one per movement mode
pub fn builtin_presets() -> Vec<Preset> {
    let base = ParameterSet::default();
    let entries = [
        (
            "Drift",
            "Slow trails following the ambient heading",
            ParameterSet {
                motion_decay_rate: 0.92,
                movement_speed: 6.0,
                move_type: MoveType::Direction,
                ..base.clone()
            },
        ),
        (
            "Radial Bloom",
            "Motion pushed outward from the centre",
            ParameterSet {
                motion_decay_rate: 0.88,
                movement_speed: 14.0,
                move_type: MoveType::Radial,
                ..base.clone()
            },
        ),
        (
            "Vortex",
            "Trails spun around the centre",
            ParameterSet {
                motion_decay_rate: 0.9,
                rotation_speed: 1.2,
                move_type: MoveType::Spiral,
                ..base.clone()
            },
        ),
        (
            "Ripple",
            "Vertical wave displacement",
            ParameterSet {
                wave_amplitude: 120.0,
                wave_frequency: 0.02,
                move_type: MoveType::Wave,
                wave_axis: WaveAxis::Vertical,
                ..base.clone()
            },
        ),
    ];

    entries
        .into_iter()
        .filter_map(|(name, description, options)| {
            Preset::new(name, &options, Some(description)).ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_and_copies() {
        let options = ParameterSet::default();
        let preset = Preset::new("  Calm  ", &options, Some("  ")).unwrap();
        assert_eq!(preset.name, "Calm");
        assert_eq!(preset.description, None);
        assert_eq!(preset.options, options);
        assert_eq!(preset.created_at, preset.updated_at);
    }

    #[test]
    fn test_blank_name_rejected() {
        assert_eq!(
            Preset::new("   ", &ParameterSet::default(), None),
            Err(PresetError::EmptyName)
        );
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Preset::new("a", &ParameterSet::default(), None).unwrap();
        let b = Preset::new("a", &ParameterSet::default(), None).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_apply_update_refreshes_timestamp() {
        let mut preset = Preset::new("a", &ParameterSet::default(), None).unwrap();
        let created = preset.updated_at;
        assert!(preset.apply_update(&PresetUpdate {
            description: Some(Some("notes".to_string())),
            ..PresetUpdate::name(" b ")
        }));
        assert_eq!(preset.name, "b");
        assert_eq!(preset.description.as_deref(), Some("notes"));
        assert!(preset.updated_at >= created);

        assert!(!preset.apply_update(&PresetUpdate::name("")));
        assert_eq!(preset.name, "b");
    }

    #[test]
    fn test_serialized_record_shape() {
        let preset = Preset::new("a", &ParameterSet::default(), Some("d")).unwrap();
        let value = serde_json::to_value(&preset).unwrap();
        for key in ["id", "name", "description", "options", "createdAt", "updatedAt"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        let created = value["createdAt"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(created).is_ok());
    }

    #[test]
    fn test_builtins_cover_every_mode() {
        let presets = builtin_presets();
        assert_eq!(presets.len(), 4);
        for mode in [MoveType::Direction, MoveType::Radial, MoveType::Spiral, MoveType::Wave] {
            assert!(presets.iter().any(|p| p.options.move_type == mode));
        }
    }
}
