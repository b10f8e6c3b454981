//! JSON-file settings store.
//!
//! Per-pattern user toggles and the breathing knobs live in one small JSON
//! document.  Every getter distinguishes "never written" (`None`) from an
//! explicit value so the documented defaults apply exactly once, at the
//! consumer.  Writes go through immediately; a failed write costs
//! persistence, not correctness, so it is logged and ignored.

use std::collections::HashMap;
use std::path::PathBuf;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::SettingsPort;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsData {
    /// Per-pattern enable toggles, keyed by pattern name.
    #[serde(default)]
    patterns: HashMap<String, bool>,
    #[serde(default)]
    sw_breathing_enabled: Option<bool>,
    #[serde(default)]
    breath_battery_limit: Option<u8>,
    #[serde(default)]
    led_enabled: Option<bool>,
}

pub struct JsonSettings {
    path: PathBuf,
    data: SettingsData,
}

impl JsonSettings {
    /// Open the store; a missing or unreadable file means defaults.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(data) => data,
                Err(e) => {
                    warn!("settings {} corrupt ({e}), starting from defaults", path.display());
                    SettingsData::default()
                }
            },
            Err(e) => {
                info!("settings {} not readable ({e}), starting from defaults", path.display());
                SettingsData::default()
            }
        };
        Self { path, data }
    }

    fn persist(&self) {
        let json = match serde_json::to_string_pretty(&self.data) {
            Ok(j) => j,
            Err(e) => {
                warn!("settings serialisation failed: {e}");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, json) {
            warn!("settings write to {} failed: {e}", self.path.display());
        }
    }
}

impl SettingsPort for JsonSettings {
    fn pattern_enabled(&self, name: &str) -> Option<bool> {
        self.data.patterns.get(name).copied()
    }

    fn store_pattern_enabled(&mut self, name: &str, enabled: bool) {
        self.data.patterns.insert(name.to_string(), enabled);
        self.persist();
    }

    fn sw_breathing_enabled(&self) -> Option<bool> {
        self.data.sw_breathing_enabled
    }

    fn store_sw_breathing_enabled(&mut self, on: bool) {
        self.data.sw_breathing_enabled = Some(on);
        self.persist();
    }

    fn breath_battery_limit(&self) -> Option<u8> {
        self.data.breath_battery_limit
    }

    fn store_breath_battery_limit(&mut self, limit: u8) {
        self.data.breath_battery_limit = Some(limit);
        self.persist();
    }

    fn led_enabled(&self) -> Option<bool> {
        self.data.led_enabled
    }

    fn store_led_enabled(&mut self, on: bool) {
        self.data.led_enabled = Some(on);
        self.persist();
    }
}
