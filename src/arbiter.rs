//! Winner selection.
//!
//! The arbiter is a pure function of the priority-ordered pattern slice and
//! the current environment snapshot: walk patterns from most urgent to
//! least, and the first one whose *show* predicate passes wins.  No state,
//! no hardware, no failure modes — which is also what makes the whole
//! policy table testable against scripted environments.

use std::time::Duration;

use crate::patterns::{Pattern, VisibilityPolicy};

/// Display brightness steps; the environment's LED brightness lives in
/// `1..=MAX_BRIGHTNESS_STEP`.
pub const MAX_BRIGHTNESS_STEP: u8 = 20;

/// How recently the user must have been active for a notification-class
/// pattern to count as "seen".
pub const USER_ACTIVITY_WINDOW: Duration = Duration::from_secs(2);

// ───────────────────────────────────────────────────────────────
// Environment snapshot
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    On,
    Dim,
    Off,
    LpmOn,
    LpmOff,
    PowerUp,
    PowerDown,
    Undef,
}

impl DisplayState {
    /// Off, or either low-power-mode state.
    pub fn is_off_class(self) -> bool {
        matches!(self, Self::Off | Self::LpmOn | Self::LpmOff)
    }

    /// On or dimmed.
    pub fn is_on_class(self) -> bool {
        matches!(self, Self::On | Self::Dim)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    User,
    /// Charging-only mode: powered down but showing charge status.
    ActDead,
    Shutdown,
    Reboot,
    Undef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargerState {
    On,
    Off,
    Undef,
}

/// Everything outside the pattern stack that arbitration depends on.
/// Pushed into the core through the service's setters.
#[derive(Debug, Clone)]
pub struct Environment {
    pub display: DisplayState,
    pub system: SystemState,
    /// LED master switch.
    pub led_enabled: bool,
    pub charger: ChargerState,
    pub battery_percent: u8,
    /// Boot-time timestamp of the last user input, if any was seen yet.
    pub last_activity: Option<Duration>,
    /// Display brightness step, `1..=MAX_BRIGHTNESS_STEP`.
    pub led_brightness: u8,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            display: DisplayState::Undef,
            system: SystemState::Undef,
            led_enabled: true,
            charger: ChargerState::Undef,
            battery_percent: 0,
            last_activity: None,
            led_brightness: MAX_BRIGHTNESS_STEP,
        }
    }

    /// Whether the user touched the device within the activity window.
    pub fn recent_activity(&self, now: Duration) -> bool {
        self.last_activity
            .is_some_and(|t| now.saturating_sub(t) <= USER_ACTIVITY_WINDOW)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Show predicate and selection
// ───────────────────────────────────────────────────────────────

/// The *show* predicate: may this pattern drive the LED right now?
pub fn visible(p: &Pattern, env: &Environment) -> bool {
    if !p.active || !p.enabled {
        return false;
    }
    // The master switch silences everything except the forced class.
    if !env.led_enabled && p.policy != VisibilityPolicy::Forced {
        return false;
    }
    match p.policy {
        VisibilityPolicy::Always | VisibilityPolicy::Forced => true,
        VisibilityPolicy::DisplayDim => env.display == DisplayState::Dim,
        VisibilityPolicy::DisplayOn => env.display.is_on_class(),
        VisibilityPolicy::DisplayOff => {
            env.display.is_off_class()
                && matches!(env.system, SystemState::User | SystemState::ActDead)
        }
        VisibilityPolicy::ActDead => env.system == SystemState::ActDead,
        VisibilityPolicy::Notification => env.display.is_off_class(),
    }
}

/// Pick the winning pattern: first visible one in ascending priority
/// order (the slice is already sorted by the repository).
pub fn select(patterns: &[Pattern], env: &Environment) -> Option<usize> {
    patterns.iter().position(|p| visible(p, env))
}
