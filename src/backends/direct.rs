//! Direct monochrome backend — one LED behind the kernel LED class.
//!
//! Blinking uses the kernel `timer` trigger: select the trigger, then
//! write the two delay files.  A solid pattern (off period 0) drops back
//! to no trigger and just sets brightness.  Intensity combines the
//! pattern's 16-step level with the global display-tracking step.

use std::path::Path;

use crate::adapters::sysfs::SysfsFile;
use crate::app::ports::{BackendPort, Brightness};
use crate::arbiter::MAX_BRIGHTNESS_STEP;
use crate::patterns::Pattern;

/// 16-step brightness table: pattern step → sysfs brightness value.
const BRIGHTNESS_STEPS: [u8; 16] =
    [0, 17, 34, 51, 68, 85, 102, 119, 136, 153, 170, 187, 204, 221, 238, 255];

pub struct DirectMonoLed {
    trigger: SysfsFile,
    delay_on: SysfsFile,
    delay_off: SysfsFile,
    brightness: SysfsFile,
    /// Global display-tracking step, `1..=MAX_BRIGHTNESS_STEP`.
    level: u8,
    /// Pattern step (0..=15) of whatever is currently programmed.
    pattern_step: u8,
}

impl DirectMonoLed {
    /// `led_dir` is the LED-class directory, e.g. `/sys/class/leds/status`.
    pub fn new(led_dir: &Path) -> Self {
        Self {
            trigger: SysfsFile::new(led_dir.join("trigger")),
            delay_on: SysfsFile::new(led_dir.join("delay_on")),
            delay_off: SysfsFile::new(led_dir.join("delay_off")),
            brightness: SysfsFile::new(led_dir.join("brightness")),
            level: MAX_BRIGHTNESS_STEP,
            pattern_step: 0,
        }
    }

    fn write_brightness(&self) -> bool {
        let base = u32::from(BRIGHTNESS_STEPS[usize::from(self.pattern_step.min(15))]);
        let scaled = base * u32::from(self.level) / u32::from(MAX_BRIGHTNESS_STEP);
        self.brightness.write(&scaled.to_string())
    }
}

impl BackendPort for DirectMonoLed {
    fn program(&mut self, pattern: &Pattern) -> bool {
        self.pattern_step = pattern.brightness;
        let ok = if pattern.off_period_ms == 0 {
            // Solid: no trigger, brightness alone drives the LED.
            self.trigger.write("none")
        } else {
            self.trigger.write("timer")
                && self.delay_on.write(&pattern.on_period_ms.to_string())
                && self.delay_off.write(&pattern.off_period_ms.to_string())
        };
        self.write_brightness() && ok
    }

    fn disable(&mut self) {
        self.pattern_step = 0;
        self.trigger.write("none");
        self.brightness.write("0");
    }

    fn set_brightness(&mut self, level: Brightness) {
        if let Brightness::Level(step) = level {
            self.level = step.clamp(1, MAX_BRIGHTNESS_STEP);
        }
        self.write_brightness();
    }
}
