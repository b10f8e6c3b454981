//! Placeholder indicator hand-off.
//!
//! Devices whose LED is owned by a vendor indicator service plug their own
//! [`IndicatorPort`] adapter in here; everything it needs to implement is
//! the port.  Until then this logging stand-in keeps the rgb-shim backend
//! wired end to end.

use log::debug;

use crate::app::ports::IndicatorPort;

pub struct LoggingIndicator;

impl IndicatorPort for LoggingIndicator {
    fn set_pattern(&mut self, rgb: (u8, u8, u8), on_ms: u32, off_ms: u32) -> bool {
        debug!(
            "indicator: pattern #{:02x}{:02x}{:02x} on={on_ms}ms off={off_ms}ms",
            rgb.0, rgb.1, rgb.2
        );
        true
    }

    fn clear(&mut self) -> bool {
        debug!("indicator: clear");
        true
    }

    fn set_brightness(&mut self, level: u8) -> bool {
        debug!("indicator: brightness {level}");
        true
    }

    fn set_breathing(&mut self, enable: bool) {
        debug!("indicator: breathing {}", if enable { "on" } else { "off" });
    }

    fn drain(&mut self) {
        debug!("indicator: drained");
    }
}
