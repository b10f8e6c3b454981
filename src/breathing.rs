//! Software-breathing supervision.
//!
//! Breathing replaces the hard on/off toggle with a slow sinusoidal ramp
//! rendered in software, which means the CPU must stay awake for the whole
//! animation — so the supervisor pairs every breathing window with a
//! suspend-blocker hold.  Order is load-bearing: acquire before enabling,
//! disable before releasing.

use crate::app::ports::{BackendPort, PowerHoldPort};
use crate::arbiter::{ChargerState, Environment};
use crate::patterns::Pattern;

/// Battery floor (percent) below which breathing is off unless charging.
pub const DEFAULT_BREATH_BATTERY_LIMIT: u8 = 90;

/// Patterns that breathe regardless of settings and battery.
const MUST_BREATHE: [&str; 3] =
    ["PatternBatteryFull", "PatternTestBreathe1", "PatternTestBreathe2"];

const BREATH_ON_MS: core::ops::RangeInclusive<u32> = 250..=1500;
const BREATH_OFF_MS: core::ops::RangeInclusive<u32> = 250..=5000;

/// A pattern's envelope is slow enough to ramp smoothly.
pub fn can_breathe(p: &Pattern) -> bool {
    BREATH_ON_MS.contains(&p.on_period_ms) && BREATH_OFF_MS.contains(&p.off_period_ms)
}

/// Compiled-in allow-list that overrides every gate.
pub fn must_breathe(p: &Pattern) -> bool {
    MUST_BREATHE.contains(&p.name.as_str())
}

/// Decides whether the winning pattern should breathe, and walks the
/// backend + power-hold pair through the transitions.
pub struct BreathingSupervisor {
    /// User setting: software breathing allowed at all.
    pub setting_enabled: bool,
    /// User setting: minimum battery percent when not on charger.
    pub battery_limit: u8,
    engaged: bool,
}

impl BreathingSupervisor {
    pub fn new(setting_enabled: bool, battery_limit: u8) -> Self {
        Self { setting_enabled, battery_limit, engaged: false }
    }

    /// Whether breathing is currently running (and the power-hold held).
    pub fn engaged(&self) -> bool {
        self.engaged
    }

    /// The eligibility predicate.
    pub fn desired(&self, winner: Option<&Pattern>, env: &Environment) -> bool {
        let Some(p) = winner else { return false };
        if must_breathe(p) {
            return true;
        }
        self.setting_enabled
            && (env.charger == ChargerState::On || env.battery_percent >= self.battery_limit)
            && can_breathe(p)
    }

    /// Apply a new desired state.  Acquire-then-enable on the way up,
    /// disable-then-release on the way down.
    pub fn update(
        &mut self,
        desired: bool,
        backend: &mut impl BackendPort,
        power: &mut impl PowerHoldPort,
    ) {
        if desired == self.engaged {
            return;
        }
        if desired {
            power.acquire();
            backend.set_sw_breathing(true);
        } else {
            backend.set_sw_breathing(false);
            power.release();
        }
        self.engaged = desired;
    }
}
