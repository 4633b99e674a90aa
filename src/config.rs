//! User preferences persisted between sessions.
//!
//! Only editor settings are stored. The diagram itself always starts from
//! [`crate::types::Diagram::initial`].

use crate::constants::{DEFAULT_DEBOUNCE_DELAY, DEFAULT_MAX_HISTORY_SIZE};
use crate::routing::EdgeStyle;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Key under which the configuration is stored by eframe.
pub const STORAGE_KEY: &str = "editor_config";

/// Editor preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Number of snapshots kept by the undo history
    pub max_history_size: usize,
    /// Quiet period before an edit is committed to history, in milliseconds
    pub debounce_ms: u64,
    /// How connections are routed and drawn
    pub edge_style: EdgeStyle,
    /// Corner radius used by [`EdgeStyle::Rounded`]
    pub corner_radius: f32,
    /// Whether the background grid is drawn
    pub show_grid: bool,
    /// Whether the minimap overlay is shown
    pub show_minimap: bool,
    /// Whether the FPS and scene statistics overlay is shown
    pub show_resource_monitor: bool,
    /// Whether dark mode visuals are enabled
    pub dark_mode: bool,
    /// Remembered width of the properties panel
    pub properties_panel_width: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
            debounce_ms: DEFAULT_DEBOUNCE_DELAY.as_millis() as u64,
            edge_style: EdgeStyle::default(),
            corner_radius: 5.0,
            show_grid: true,
            show_minimap: true,
            show_resource_monitor: false,
            dark_mode: true,
            properties_panel_width: 280.0,
        }
    }
}

impl EditorConfig {
    /// Debounce delay as a [`Duration`].
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Serializes the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Loads the stored configuration, falling back to defaults when nothing is
    /// stored or the stored value cannot be read.
    pub fn load(storage: Option<&dyn eframe::Storage>) -> Self {
        let Some(json) = storage.and_then(|s| s.get_string(STORAGE_KEY)) else {
            log::info!("config: no stored preferences, using defaults");
            return Self::default();
        };
        match Self::from_json(&json) {
            Ok(config) => {
                log::debug!("config: loaded stored preferences");
                config
            }
            Err(err) => {
                log::warn!("config: ignoring unreadable preferences: {err}");
                Self::default()
            }
        }
    }

    /// Writes the configuration into eframe's storage.
    pub fn store(&self, storage: &mut dyn eframe::Storage) {
        match self.to_json() {
            Ok(json) => storage.set_string(STORAGE_KEY, json),
            Err(err) => log::error!("config: failed to serialize preferences: {err}"),
        }
    }
}
