//! Durable preset collection
//!
//! The whole ordered collection is stored as one JSON array. Loading never
//! fails: unreadable or malformed data yields an empty collection. Callers
//! that must not overwrite such data use [`PresetStore::read`] to tell it
//! apart from a collection that was never stored.

use std::collections::HashSet;

use super::Preset;
use crate::storage::SharedBlobStore;

/// Blob key the preset collection is stored under
pub const PRESETS_KEY: &str = "camera-motion.presets";

/// Outcome of reading the stored collection
#[derive(Debug, Clone, PartialEq)]
pub enum StoredPresets {
    /// Nothing has been stored yet
    Absent,
    /// The stored collection, repaired
    Loaded(Vec<Preset>),
    /// A blob exists but could not be read or parsed
    Unreadable,
}

impl StoredPresets {
    /// The loaded presets, empty unless the read succeeded
    pub fn into_presets(self) -> Vec<Preset> {
        match self {
            StoredPresets::Loaded(presets) => presets,
            StoredPresets::Absent | StoredPresets::Unreadable => Vec::new(),
        }
    }
}

/// Reads and writes the preset collection through a blob store
#[derive(Clone)]
pub struct PresetStore {
    blobs: SharedBlobStore,
    key: String,
}

impl PresetStore {
    /// Store presets under the default key
    pub fn new(blobs: SharedBlobStore) -> Self {
        Self::with_key(blobs, PRESETS_KEY)
    }

    /// Store presets under a custom key
    pub fn with_key(blobs: SharedBlobStore, key: impl Into<String>) -> Self {
        Self {
            blobs,
            key: key.into(),
        }
    }

    /// Load the collection, or an empty one on any failure
    pub fn load(&self) -> Vec<Preset> {
        self.read().into_presets()
    }

    /// Read the collection, reporting whether anything was stored
    ///
    /// Timestamps are revived from their RFC 3339 strings, out-of-range
    /// parameters are clamped and entries repeating an earlier id are dropped.
    pub fn read(&self) -> StoredPresets {
        let json = match self.blobs.get(&self.key) {
            Ok(Some(json)) => json,
            Ok(None) => return StoredPresets::Absent,
            Err(e) => {
                tracing::warn!(key = %self.key, "Failed to read presets: {}", e);
                return StoredPresets::Unreadable;
            }
        };

        let presets: Vec<Preset> = match serde_json::from_str(&json) {
            Ok(presets) => presets,
            Err(e) => {
                tracing::warn!(key = %self.key, "Failed to parse presets: {}", e);
                return StoredPresets::Unreadable;
            }
        };

        let mut seen = HashSet::new();
        let loaded: Vec<Preset> = presets
            .into_iter()
            .filter(|p| {
                let fresh = seen.insert(p.id.clone());
                if !fresh {
                    tracing::warn!(id = %p.id, "Dropping preset with duplicate id");
                }
                fresh
            })
            .map(|mut p| {
                p.options.clamp_all();
                p
            })
            .collect();

        tracing::debug!(count = loaded.len(), "Loaded presets");
        StoredPresets::Loaded(loaded)
    }

    /// Persist the full collection; returns false if it could not be written
    pub fn save(&self, presets: &[Preset]) -> bool {
        let json = match serde_json::to_string(presets) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize presets: {}", e);
                return false;
            }
        };
        match self.blobs.set(&self.key, &json) {
            Ok(()) => {
                tracing::trace!(count = presets.len(), "Saved presets");
                true
            }
            Err(e) => {
                tracing::warn!(key = %self.key, "Failed to save presets: {}", e);
                false
            }
        }
    }

    /// Remove the stored collection
    pub fn clear(&self) {
        if let Err(e) = self.blobs.remove(&self.key) {
            tracing::warn!(key = %self.key, "Failed to clear presets: {}", e);
        }
    }
}
