//! Group-keyed configuration file parsing.
//!
//! Pattern definitions arrive in an INI-style keyfile: `[Section]` headers,
//! `Key=Value` entries, `#` comments, comma-separated lists.  The `[LED]`
//! section names the backend family (written there by the platform
//! capability probe), the pattern group to load, and the required /
//! disabled / combination-rule lists; the pattern group section holds one
//! entry per pattern.
//!
//! ```text
//! [LED]
//! Backend=engine-rgb-a
//! PatternGroup=LedPatternsRgbA
//! RequiredPatterns=PatternBatteryFull,PatternCommunicationCall
//!
//! [LedPatternsRgbA]
//! PatternBatteryFull=10,3,0,4a00ff05,4a00ff05,4a00ff05
//! ```
//!
//! Parsing never fails on malformed lines — they are skipped with a log
//! entry so one stray edit cannot take the whole indicator service down.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, warn};

use crate::error::ConfigError;

/// Section holding the top-level LED configuration.
pub const LED_SECTION: &str = "LED";
/// Backend family tag, written by the capability probe.
pub const KEY_BACKEND: &str = "Backend";
/// Name of the section holding this device's pattern definitions.
pub const KEY_PATTERN_GROUP: &str = "PatternGroup";
/// Comma-separated list of pattern names to load from the group.
pub const KEY_REQUIRED_PATTERNS: &str = "RequiredPatterns";
/// Comma-separated list of pattern names to suppress.
pub const KEY_DISABLED_PATTERNS: &str = "DisabledPatterns";
/// Comma-separated list of combination-rule keys in the group.
pub const KEY_COMBINATION_RULES: &str = "CombinationRules";
/// I²C character device for the engine controller families.
pub const KEY_ENGINE_DEVICE: &str = "EngineDevice";
/// I²C address of the engine controller (hex, e.g. `32`).
pub const KEY_ENGINE_ADDRESS: &str = "EngineAddress";
/// LED-class sysfs directory for the direct-mono family.
pub const KEY_LED_CLASS_PATH: &str = "LedClassPath";

/// Parsed keyfile: section name → (key → raw value).
///
/// Values keep whatever whitespace-trimmed text followed the first `=`;
/// interpretation (numbers, lists, hex) happens at the consumer.
pub struct KeyFile {
    sections: HashMap<String, HashMap<String, String>>,
}

impl KeyFile {
    /// Read and parse a keyfile from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Ok(Self::parse(&text))
    }

    /// Parse keyfile text.  Malformed lines are skipped, not fatal.
    pub fn parse(text: &str) -> Self {
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current: Option<String> = None;

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let name = name.trim();
                if name.is_empty() {
                    warn!("config: empty section header at line {}", lineno + 1);
                    current = None;
                } else {
                    sections.entry(name.to_string()).or_default();
                    current = Some(name.to_string());
                }
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                warn!("config: skipping malformed line {}: '{line}'", lineno + 1);
                continue;
            };
            let Some(section) = &current else {
                warn!("config: entry before any section at line {}", lineno + 1);
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                warn!("config: empty key at line {}", lineno + 1);
                continue;
            }
            if let Some(section_map) = sections.get_mut(section) {
                let prev = section_map.insert(key.to_string(), value.trim().to_string());
                if prev.is_some() {
                    debug!("config: duplicate key '{key}' in [{section}], last wins");
                }
            }
        }

        Self { sections }
    }

    /// Fetch a raw value.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }

    /// Fetch a value that must be present.
    pub fn require(&self, section: &str, key: &str) -> Result<&str, ConfigError> {
        self.get(section, key).ok_or_else(|| ConfigError::MissingKey {
            section: section.to_string(),
            key: key.to_string(),
        })
    }

    /// Fetch a comma-separated list; empty entries are dropped.
    pub fn get_list(&self, section: &str, key: &str) -> Vec<String> {
        self.get(section, key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a section exists at all.
    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }
}
