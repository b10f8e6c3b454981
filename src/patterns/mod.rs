//! Pattern records and the priority-ordered repository.
//!
//! Every indicator behaviour the daemon can show is a [`Pattern`] loaded
//! once at startup from the keyfile group matching the probed backend
//! family.  The repository owns all patterns for the process lifetime;
//! everything else refers to them by index.
//!
//! Validation is per backend family: each family declares how many fields a
//! definition carries and what they mean.  Bad definitions are rejected
//! with a warning and loading continues — one broken pattern must not cost
//! the device its charging indicator.

pub mod graph;
pub mod timers;

use std::time::Duration;

use log::{debug, warn};

use crate::app::ports::SettingsPort;
use crate::config::{
    KeyFile, KEY_DISABLED_PATTERNS, KEY_PATTERN_GROUP, KEY_REQUIRED_PATTERNS, LED_SECTION,
};
use crate::error::ConfigError;

/// Engine micro-programs are hex strings capped at 64 characters.
pub type ProgramString = heapless::String<64>;

/// Maximum per-pattern brightness step for the direct-mono family.
pub const MAX_PATTERN_BRIGHTNESS: u8 = 15;

// ───────────────────────────────────────────────────────────────
// Visibility policy
// ───────────────────────────────────────────────────────────────

/// When a pattern may be shown, given display/system state and the LED
/// master switch.  Keyfile discriminants are the closed set 1..=7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VisibilityPolicy {
    /// Show while the display is on or dimmed.
    DisplayOn = 1,
    /// Show while the display is off-class, in normal use or act-dead.
    DisplayOff = 2,
    /// Show regardless of display and system state.
    Always = 3,
    /// Show only while the device is in act-dead (charging-only) mode.
    ActDead = 4,
    /// Show always, even when the user has switched the LED off.
    Forced = 5,
    /// Notification class: show while display is off, dismissed when the
    /// user sees it (undecided lifecycle handled by the service).
    Notification = 6,
    /// Show only while the display is dimmed.
    DisplayDim = 7,
}

impl VisibilityPolicy {
    /// Map a keyfile policy number onto the closed enum.
    pub fn from_config(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::DisplayOn),
            2 => Some(Self::DisplayOff),
            3 => Some(Self::Always),
            4 => Some(Self::ActDead),
            5 => Some(Self::Forced),
            6 => Some(Self::Notification),
            7 => Some(Self::DisplayDim),
            _ => None,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Backend family
// ───────────────────────────────────────────────────────────────

/// Hardware adaptation variant, selected once at startup by the platform
/// capability probe (its result lands in the keyfile's `Backend` key).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFamily {
    /// No LED on this device; all hardware calls are no-ops.
    None,
    /// Single LED behind the kernel LED class (trigger + delay files).
    DirectMono,
    /// Single-channel I²C engine controller, fixed-wiring register map.
    EngineMonoA,
    /// Single-channel I²C engine controller, muxed register map.
    EngineMonoB,
    /// Three-channel RGB engine controller, fixed wiring.
    EngineRgbA,
    /// Two-engine RGB controller with per-engine LED mux.
    EngineRgbB,
    /// RGB triple plus on/off periods handed to an external indicator
    /// service.
    RgbShim,
}

impl BackendFamily {
    /// Parse the capability probe's tag from the keyfile.
    pub fn from_config(tag: &str) -> Option<Self> {
        match tag {
            "none" => Some(Self::None),
            "direct-mono" => Some(Self::DirectMono),
            "engine-mono-a" => Some(Self::EngineMonoA),
            "engine-mono-b" => Some(Self::EngineMonoB),
            "engine-rgb-a" => Some(Self::EngineRgbA),
            "engine-rgb-b" => Some(Self::EngineRgbB),
            "rgb-shim" => Some(Self::RgbShim),
            _ => None,
        }
    }

    /// Number of comma-separated fields a pattern definition carries.
    pub fn field_count(self) -> usize {
        match self {
            Self::None => 0,
            Self::EngineMonoA | Self::EngineMonoB => 4,
            Self::DirectMono | Self::EngineRgbA | Self::EngineRgbB | Self::RgbShim => 6,
        }
    }

    /// Whether this family's configuration publishes a disabled-pattern
    /// list.  The mono families predate that key and never carry it.
    pub fn publishes_disabled_list(self) -> bool {
        matches!(self, Self::EngineRgbA | Self::EngineRgbB | Self::RgbShim)
    }
}

// ───────────────────────────────────────────────────────────────
// Pattern
// ───────────────────────────────────────────────────────────────

/// One named indicator behaviour.
///
/// Which fields are meaningful depends on the backend family the pattern
/// was loaded for; the rest stay at their zero values.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub name: String,
    /// Lower value = more urgent; the repository sorts ascending.
    pub priority: u32,
    pub policy: VisibilityPolicy,
    /// Auto-deactivate delay; `None` = stay active until asked.
    pub timeout: Option<Duration>,
    /// Blink envelope for the direct-mono and rgb-shim families.
    pub on_period_ms: u32,
    pub off_period_ms: u32,
    /// Direct-mono brightness step, 0..=15.
    pub brightness: u8,
    /// Per-engine hex micro-programs (engine families).
    pub channels: [ProgramString; 3],
    /// LED masks for the two engines of the muxed family.
    pub engine1_mux: u8,
    pub engine2_mux: u8,
    /// 24-bit colour for the rgb-shim family.
    pub rgb_color: u32,
    /// A client asked for this pattern and no deactivation matched yet.
    pub active: bool,
    /// The user has not disabled this pattern in settings.
    pub enabled: bool,
    /// Notification-class pattern not yet locked in or dismissed.
    pub undecided: bool,
}

impl Pattern {
    /// Split the shim colour into its r/g/b bytes.
    pub fn rgb_bytes(&self) -> (u8, u8, u8) {
        (
            (self.rgb_color >> 16) as u8,
            (self.rgb_color >> 8) as u8,
            self.rgb_color as u8,
        )
    }

    fn blank(name: &str, priority: u32, policy: VisibilityPolicy, timeout: Option<Duration>) -> Self {
        Self {
            name: name.to_string(),
            priority,
            policy,
            timeout,
            on_period_ms: 0,
            off_period_ms: 0,
            brightness: 0,
            channels: [ProgramString::new(), ProgramString::new(), ProgramString::new()],
            engine1_mux: 0,
            engine2_mux: 0,
            rgb_color: 0,
            active: false,
            enabled: true,
            undecided: false,
        }
    }

    /// Parse one definition line for the given family.
    pub fn parse(name: &str, definition: &str, family: BackendFamily) -> Result<Self, ConfigError> {
        let fields: Vec<&str> = definition.split(',').map(str::trim).collect();
        let expected = family.field_count();
        if fields.len() != expected {
            return Err(ConfigError::FieldCount { expected, got: fields.len() });
        }

        let priority: u32 = fields[0].parse().map_err(|_| ConfigError::BadNumber("priority"))?;
        let policy_num: u8 = fields[1].parse().map_err(|_| ConfigError::BadNumber("policy"))?;
        let policy =
            VisibilityPolicy::from_config(policy_num).ok_or(ConfigError::BadPolicy(policy_num))?;
        let timeout_s: i64 = fields[2].parse().map_err(|_| ConfigError::BadNumber("timeout"))?;
        let timeout = (timeout_s > 0).then(|| Duration::from_secs(timeout_s as u64));

        let mut p = Self::blank(name, priority, policy, timeout);
        match family {
            BackendFamily::None => unreachable!("no patterns are loaded for the none family"),
            BackendFamily::DirectMono => {
                p.on_period_ms = fields[3].parse().map_err(|_| ConfigError::BadNumber("on_ms"))?;
                p.off_period_ms = fields[4].parse().map_err(|_| ConfigError::BadNumber("off_ms"))?;
                p.brightness =
                    fields[5].parse().map_err(|_| ConfigError::BadNumber("brightness"))?;
                if p.brightness > MAX_PATTERN_BRIGHTNESS {
                    return Err(ConfigError::ValueRange("brightness"));
                }
            }
            BackendFamily::EngineMonoA | BackendFamily::EngineMonoB => {
                p.channels[0] = parse_program(fields[3])?;
            }
            BackendFamily::EngineRgbA => {
                for (slot, field) in p.channels.iter_mut().zip(&fields[3..6]) {
                    *slot = parse_program(field)?;
                }
            }
            BackendFamily::EngineRgbB => {
                p.channels[0] = parse_program(fields[3])?;
                p.channels[1] = parse_program(fields[4])?;
                let (e1, e2) = parse_mux(fields[5])?;
                if e1 & e2 != 0 {
                    return Err(ConfigError::MuxOverlap);
                }
                p.engine1_mux = e1;
                p.engine2_mux = e2;
            }
            BackendFamily::RgbShim => {
                p.on_period_ms = fields[3].parse().map_err(|_| ConfigError::BadNumber("on_ms"))?;
                p.off_period_ms = fields[4].parse().map_err(|_| ConfigError::BadNumber("off_ms"))?;
                let color = fields[5];
                if color.len() != 6 {
                    return Err(ConfigError::ValueRange("color"));
                }
                p.rgb_color =
                    u32::from_str_radix(color, 16).map_err(|_| ConfigError::BadNumber("color"))?;
            }
        }
        Ok(p)
    }
}

/// Validate and store one engine micro-program.  Empty means the channel is
/// unused; anything else must be even-length hex within the 64-char cap.
fn parse_program(field: &str) -> Result<ProgramString, ConfigError> {
    if field.is_empty() {
        return Ok(ProgramString::new());
    }
    if field.len() % 2 != 0 {
        return Err(ConfigError::ProgramInvalid("odd length"));
    }
    if !field.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ConfigError::ProgramInvalid("not hex"));
    }
    ProgramString::try_from(field).map_err(|()| ConfigError::ProgramInvalid("longer than 64 chars"))
}

/// Mux field: four hex chars, engine 1 mask then engine 2 mask.
fn parse_mux(field: &str) -> Result<(u8, u8), ConfigError> {
    if field.len() != 4 {
        return Err(ConfigError::ValueRange("mux"));
    }
    let e1 = u8::from_str_radix(&field[0..2], 16).map_err(|_| ConfigError::BadNumber("mux"))?;
    let e2 = u8::from_str_radix(&field[2..4], 16).map_err(|_| ConfigError::BadNumber("mux"))?;
    Ok((e1, e2))
}

// ───────────────────────────────────────────────────────────────
// Repository
// ───────────────────────────────────────────────────────────────

/// Owns every pattern for the process lifetime, sorted ascending by
/// priority with insertion order breaking ties.
pub struct PatternRepository {
    patterns: Vec<Pattern>,
}

impl PatternRepository {
    /// Load the pattern group for `family` from the keyfile.
    ///
    /// The required list is cleaned (empties dropped, sorted, de-duplicated)
    /// before lookup; names on the disabled list are suppressed entirely.
    /// Individually invalid definitions are skipped with a warning.
    pub fn load(
        family: BackendFamily,
        keyfile: &KeyFile,
        settings: &impl SettingsPort,
    ) -> Result<Self, ConfigError> {
        if family == BackendFamily::None {
            return Ok(Self { patterns: Vec::new() });
        }

        let group = keyfile.require(LED_SECTION, KEY_PATTERN_GROUP)?.to_string();
        let mut required = keyfile.get_list(LED_SECTION, KEY_REQUIRED_PATTERNS);
        if required.is_empty() {
            return Err(ConfigError::MissingKey {
                section: LED_SECTION.to_string(),
                key: KEY_REQUIRED_PATTERNS.to_string(),
            });
        }
        required.sort();
        required.dedup();

        let disabled: Vec<String> = if family.publishes_disabled_list() {
            keyfile.get_list(LED_SECTION, KEY_DISABLED_PATTERNS)
        } else {
            Vec::new()
        };

        let mut patterns = Vec::with_capacity(required.len());
        for name in &required {
            if disabled.iter().any(|d| d == name) {
                debug!("pattern {name} suppressed by the disabled list");
                continue;
            }
            let Some(definition) = keyfile.get(&group, name) else {
                warn!("required pattern {name} has no definition in [{group}]");
                continue;
            };
            match Pattern::parse(name, definition, family) {
                Ok(mut p) => {
                    // A toggle that was never written means enabled.
                    p.enabled = settings.pattern_enabled(name).unwrap_or(true);
                    patterns.push(p);
                }
                Err(e) => warn!("rejecting pattern {name}: {e}"),
            }
        }

        // Stable sort keeps insertion order as the tie-break.
        patterns.sort_by_key(|p| p.priority);
        Ok(Self { patterns })
    }

    /// Build a repository directly from patterns (tests, tools).
    pub fn from_patterns(mut patterns: Vec<Pattern>) -> Self {
        patterns.sort_by_key(|p| p.priority);
        Self { patterns }
    }

    /// Index of the pattern with this name.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.patterns.iter().position(|p| p.name == name)
    }

    pub fn get(&self, idx: usize) -> &Pattern {
        &self.patterns[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut Pattern {
        &mut self.patterns[idx]
    }

    /// All patterns in ascending priority order.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
