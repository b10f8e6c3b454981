//! Port traits — the boundary between the arbitration core and the world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ LedService (domain)
//! ```
//!
//! Driven adapters (LED backends, the signal bus, the settings store, the
//! boot-time clock, the suspend blocker) implement these traits.  The
//! [`LedService`](super::service::LedService) consumes them via generics at
//! the call site, so the domain core never touches hardware directly and
//! every test runs against mock adapters.

use std::time::Duration;

use crate::patterns::Pattern;

use super::events::LedSignal;

// ───────────────────────────────────────────────────────────────
// Backend port (domain → LED hardware)
// ───────────────────────────────────────────────────────────────

/// Global output intensity, or a hue-only refresh of the current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Brightness {
    /// Display brightness step, `1..=MAX_BRIGHTNESS_STEP`.
    Level(u8),
    /// Re-apply the cached level; used after the lit colour changed.
    Reapply,
}

/// The narrow capability set every LED backend variant implements.
///
/// Hardware trouble never propagates: implementations log the failure and
/// report plain success/failure, and the arbiter treats the LED as
/// best-effort.
pub trait BackendPort {
    /// Install the pattern so it visibly runs.
    fn program(&mut self, pattern: &Pattern) -> bool;

    /// Quiesce all channels and engines.
    fn disable(&mut self);

    /// Adjust output intensity without reprogramming the pattern.
    fn set_brightness(&mut self, level: Brightness);

    /// Whether this backend can animate the envelope in software.
    fn supports_sw_breathing(&self) -> bool {
        false
    }

    /// Start or stop software breathing of the installed pattern.
    fn set_sw_breathing(&mut self, _enable: bool) {}

    /// Shutdown-time quiesce; backends with an asynchronous hand-off
    /// drain their in-flight work here.
    fn quiesce(&mut self) {
        self.disable();
    }
}

// ───────────────────────────────────────────────────────────────
// Signal sink (domain → bus observers)
// ───────────────────────────────────────────────────────────────

/// Where pattern activation/deactivation announcements go.  Adapters
/// decide the transport; send failures are logged and swallowed there.
pub trait SignalSink {
    fn emit(&mut self, signal: &LedSignal);
}

// ───────────────────────────────────────────────────────────────
// Settings store (user toggles, breathing knobs)
// ───────────────────────────────────────────────────────────────

/// Persistent per-user settings.  Every getter returns `None` for a value
/// that was never written; the caller applies the documented default
/// (patterns default to enabled, breathing to on, the battery limit to 90).
pub trait SettingsPort {
    fn pattern_enabled(&self, name: &str) -> Option<bool>;
    fn store_pattern_enabled(&mut self, name: &str, enabled: bool);

    fn sw_breathing_enabled(&self) -> Option<bool>;
    fn store_sw_breathing_enabled(&mut self, on: bool);

    fn breath_battery_limit(&self) -> Option<u8>;
    fn store_breath_battery_limit(&mut self, limit: u8);

    fn led_enabled(&self) -> Option<bool>;
    fn store_led_enabled(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Clock (boot-time monotonic)
// ───────────────────────────────────────────────────────────────

/// Monotonic time that keeps accruing across device suspend.  Pattern
/// timeout deadlines are expressed on this clock, so a 60-second indicator
/// timeout is 60 wall-clock seconds even if the device slept for 59 of
/// them.
pub trait MonotonicClock {
    /// Time since boot.
    fn now(&self) -> Duration;
}

// ───────────────────────────────────────────────────────────────
// Power hold (suspend blocker)
// ───────────────────────────────────────────────────────────────

/// Keeps the device out of suspend while software breathing animates.
/// Acquire/release are idempotent; the adapter owns the actual kernel
/// handle and releases it on drop as a backstop.
pub trait PowerHoldPort {
    fn acquire(&mut self);
    fn release(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Indicator hand-off (rgb-shim backend → external service)
// ───────────────────────────────────────────────────────────────

/// External indicator service the rgb-shim backend feeds.  The service
/// applies reprograms asynchronously; [`drain`](Self::drain) blocks until
/// everything in flight has been applied (used on shutdown only).
pub trait IndicatorPort {
    /// Hand over colour and blink envelope.
    fn set_pattern(&mut self, rgb: (u8, u8, u8), on_ms: u32, off_ms: u32) -> bool;

    /// Switch the indicator off.
    fn clear(&mut self) -> bool;

    /// Out-of-band brightness, `1..=255`.
    fn set_brightness(&mut self, level: u8) -> bool;

    /// Start or stop the breathing envelope.
    fn set_breathing(&mut self, enable: bool);

    /// Wait for in-flight reprograms to land.
    fn drain(&mut self);
}
