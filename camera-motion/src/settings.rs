//! Durable settings
//!
//! Three scalar durations persisted as one JSON object. Loading merges each
//! field with its default independently, so one malformed entry never throws
//! away the others.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::BlobStore;

/// Blob key the settings are stored under
pub const SETTINGS_KEY: &str = "camera-motion.settings";

/// Default transition duration in milliseconds
pub const DEFAULT_TRANSITION_MS: u64 = 2_000;
/// Default preset cycle interval in milliseconds
pub const DEFAULT_CYCLE_MS: u64 = 10_000;
/// Default ambient colour-change interval in milliseconds
pub const DEFAULT_COLOR_INTERVAL_MS: u64 = 5_000;

const MIN_TRANSITION_MS: u64 = 100;
const MIN_CYCLE_MS: u64 = 1_000;
const MIN_COLOR_INTERVAL_MS: u64 = 100;

/// Persisted durations, all in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionSettings {
    /// Length of preset transitions (min 100)
    pub transition_duration: u64,
    /// Time between cycle steps (min 1000)
    pub cycle_duration: u64,
    /// Time between ambient colour changes (min 100)
    ///
    /// Only stored here. The colour animation runs in the presentation
    /// layer, which reads it through [`MotionSettings::color_interval`];
    /// no timer in this crate depends on it.
    pub color_interval_duration: u64,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            transition_duration: DEFAULT_TRANSITION_MS,
            cycle_duration: DEFAULT_CYCLE_MS,
            color_interval_duration: DEFAULT_COLOR_INTERVAL_MS,
        }
    }
}

impl MotionSettings {
    /// Build settings from an arbitrary JSON value, defaulting field by field
    pub fn from_value(value: &Value) -> Self {
        let defaults = Self::default();
        Self {
            transition_duration: read_ms(value, "transitionDuration")
                .unwrap_or(defaults.transition_duration),
            cycle_duration: read_ms(value, "cycleDuration").unwrap_or(defaults.cycle_duration),
            color_interval_duration: read_ms(value, "colorIntervalDuration")
                .unwrap_or(defaults.color_interval_duration),
        }
        .clamped()
    }

    /// Raise every duration to its minimum
    pub fn clamped(self) -> Self {
        Self {
            transition_duration: self.transition_duration.max(MIN_TRANSITION_MS),
            cycle_duration: self.cycle_duration.max(MIN_CYCLE_MS),
            color_interval_duration: self.color_interval_duration.max(MIN_COLOR_INTERVAL_MS),
        }
    }

    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_duration)
    }

    pub fn cycle(&self) -> Duration {
        Duration::from_millis(self.cycle_duration)
    }

    pub fn color_interval(&self) -> Duration {
        Duration::from_millis(self.color_interval_duration)
    }

    /// Load from the blob store, falling back to defaults on any failure
    pub fn load(blobs: &dyn BlobStore) -> Self {
        let json = match blobs.get(SETTINGS_KEY) {
            Ok(Some(json)) => json,
            Ok(None) => return Self::default(),
            Err(e) => {
                tracing::warn!("Failed to read settings: {}", e);
                return Self::default();
            }
        };
        match serde_json::from_str::<Value>(&json) {
            Ok(value) => {
                let settings = Self::from_value(&value);
                tracing::debug!(?settings, "Loaded settings");
                settings
            }
            Err(e) => {
                tracing::warn!("Failed to parse settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Persist to the blob store; returns false if it could not be written
    pub fn save(&self, blobs: &dyn BlobStore) -> bool {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize settings: {}", e);
                return false;
            }
        };
        match blobs.set(SETTINGS_KEY, &json) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to save settings: {}", e);
                false
            }
        }
    }
}

/// Read a non-negative, finite millisecond count from an object field
fn read_ms(value: &Value, key: &str) -> Option<u64> {
    let ms = value.get(key)?.as_f64()?;
    (ms.is_finite() && ms >= 0.0).then(|| ms.round() as u64)
}
