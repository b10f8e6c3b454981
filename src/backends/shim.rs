//! RGB shim backend — hand-off to an external indicator service.
//!
//! Devices whose LED is owned by a vendor indicator service get this
//! adaptation layer: the pattern's 24-bit colour is split into r/g/b and
//! handed over together with the blink envelope, and brightness travels
//! out-of-band as a separate 1..=255 call.  The hand-off applies
//! asynchronously on the far side, so shutdown explicitly drains in-flight
//! reprograms before the process exits.
//!
//! This is also the only backend that can breathe: the indicator service
//! renders the sinusoidal envelope in software when asked.

use crate::app::ports::{BackendPort, Brightness, IndicatorPort};
use crate::arbiter::MAX_BRIGHTNESS_STEP;
use crate::patterns::Pattern;

pub struct ShimBackend {
    indicator: Box<dyn IndicatorPort>,
    /// Global display-tracking step, `1..=MAX_BRIGHTNESS_STEP`.
    level: u8,
    /// Whether a pattern is currently handed over.
    lit: bool,
}

impl ShimBackend {
    pub fn new(indicator: Box<dyn IndicatorPort>) -> Self {
        Self { indicator, level: MAX_BRIGHTNESS_STEP, lit: false }
    }

    /// Scale the display step onto the indicator's 1..=255 range.
    fn scaled_level(&self) -> u8 {
        let v = u32::from(self.level) * 255 / u32::from(MAX_BRIGHTNESS_STEP);
        v.max(1) as u8
    }
}

impl BackendPort for ShimBackend {
    fn program(&mut self, pattern: &Pattern) -> bool {
        let ok = self.indicator.set_pattern(
            pattern.rgb_bytes(),
            pattern.on_period_ms,
            pattern.off_period_ms,
        );
        self.lit = true;
        // The hue changed; the service needs the intensity again.
        self.indicator.set_brightness(self.scaled_level());
        ok
    }

    fn disable(&mut self) {
        self.indicator.clear();
        self.lit = false;
    }

    fn set_brightness(&mut self, level: Brightness) {
        if let Brightness::Level(step) = level {
            self.level = step.clamp(1, MAX_BRIGHTNESS_STEP);
        }
        if self.lit {
            self.indicator.set_brightness(self.scaled_level());
        }
    }

    fn supports_sw_breathing(&self) -> bool {
        true
    }

    fn set_sw_breathing(&mut self, enable: bool) {
        self.indicator.set_breathing(enable);
    }

    fn quiesce(&mut self) {
        self.disable();
        self.indicator.drain();
    }
}
