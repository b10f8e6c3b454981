//! Inbound commands to the arbitration core.
//!
//! Everything the outside world can ask for — bus method calls, settings
//! changes, and the environment updates pushed in by the display, power,
//! and input trackers.  The main loop drains these and feeds them to
//! [`LedService::handle_command`](super::service::LedService::handle_command);
//! one command is one state mutation plus exactly one arbiter pass.

use crate::arbiter::{ChargerState, DisplayState, SystemState};

/// Commands external adapters can send into the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedCommand {
    /// Request a named pattern (bus method `activate_pattern`).
    Activate(String),
    /// Withdraw a request (bus method `deactivate_pattern`).
    Deactivate(String),
    /// LED master switch on (bus method `enable_led`).
    EnableLed,
    /// LED master switch off (bus method `disable_led`).
    DisableLed,
    /// Per-pattern user toggle changed in settings.
    SetPatternEnabled(String, bool),
    /// Software-breathing master setting changed.
    SetSwBreathing(bool),
    /// Breathing battery floor changed (percent).
    SetBreathBatteryLimit(u8),
    /// Display state tracker update.
    DisplayState(DisplayState),
    /// System lifecycle tracker update.
    SystemState(SystemState),
    /// Charger plugged/unplugged.
    ChargerState(ChargerState),
    /// Battery level update (percent).
    BatteryLevel(u8),
    /// Explicit user-activity event.
    UserActivity,
    /// Display brightness step changed.
    LedBrightness(u8),
}
