//! Host settings and preferences
//!
//! Playfield size, input tuning and hint speech preferences. Persisted
//! separately from records as a small JSON file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::records::StoreError;
use crate::sim::{Controls, Field};

/// Host settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Playfield ===
    pub field_width: f32,
    pub field_height: f32,

    // === Input ===
    /// Player movement per key press (px)
    pub key_step: f32,
    /// Player movement per tap (px)
    pub tap_step: f32,
    /// Minimum time between shots (ms)
    pub cooldown_ms: u64,

    // === Hints ===
    /// Speak each round's hint when it starts
    pub speak_hints: bool,
    /// Speech language tag for hints
    pub hint_language: String,
}

impl Default for Settings {
    fn default() -> Self {
        let field = Field::default();
        Self {
            field_width: field.width,
            field_height: field.height,

            key_step: KEY_STEP,
            tap_step: TAP_STEP,
            cooldown_ms: COOLDOWN_MS,

            speak_hints: true,
            hint_language: "en-US".to_string(),
        }
    }
}

impl Settings {
    /// Playfield; non-positive dimensions fall back to defaults
    pub fn field(&self) -> Field {
        let default = Field::default();
        Field {
            width: if self.field_width > 0.0 { self.field_width } else { default.width },
            height: if self.field_height > 0.0 { self.field_height } else { default.height },
        }
    }

    pub fn controls(&self) -> Controls {
        Controls {
            key_step: self.key_step.max(0.0),
            tap_step: self.tap_step.max(0.0),
            cooldown_ms: self.cooldown_ms,
        }
    }

    /// Load settings from a file, falling back to defaults
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Invalid settings in {}: {}; using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        log::info!("Settings saved");
        Ok(())
    }
}
