//! LED backend variants.
//!
//! One variant per hardware family plus a no-op default.  The variant is
//! chosen once at startup from the capability probe's tag and held by
//! value for the process lifetime; the arbitration core only ever sees the
//! [`BackendPort`] capability set.
//!
//! | variant | hardware |
//! |---|---|
//! | `None` | no LED, every call is a no-op |
//! | `DirectMono` | kernel LED class (trigger/delay/brightness files) |
//! | `EngineMono` | I²C engine controller, single channel |
//! | `EngineRgb` | I²C engine controller, RGB (fixed or muxed family) |
//! | `RgbShim` | external indicator service hand-off |

pub mod direct;
pub mod engine;
pub mod shim;

use embedded_hal::i2c::I2c;

use crate::app::ports::{BackendPort, Brightness};
use crate::patterns::{BackendFamily, Pattern};

pub use direct::DirectMonoLed;
pub use engine::{EngineBackend, EngineFamily, EngineMode};
pub use shim::ShimBackend;

/// The selected backend, generic over the I²C bus the engine families
/// drive.  Devices without an engine controller never touch `I`.
pub enum Backend<I> {
    None,
    DirectMono(DirectMonoLed),
    EngineMono(EngineBackend<I>),
    EngineRgb(EngineBackend<I>),
    RgbShim(ShimBackend),
}

impl<I> Backend<I> {
    /// Family tag → engine driver parameters, when the family is one of
    /// the engine-controller variants.
    pub fn engine_params(family: BackendFamily) -> Option<(EngineFamily, EngineMode)> {
        match family {
            BackendFamily::EngineMonoA => Some((EngineFamily::A, EngineMode::Mono)),
            BackendFamily::EngineMonoB => Some((EngineFamily::B, EngineMode::Mono)),
            BackendFamily::EngineRgbA => Some((EngineFamily::A, EngineMode::Rgb)),
            BackendFamily::EngineRgbB => Some((EngineFamily::B, EngineMode::Rgb)),
            _ => None,
        }
    }
}

impl<I: I2c> BackendPort for Backend<I> {
    fn program(&mut self, pattern: &Pattern) -> bool {
        match self {
            Self::None => true,
            Self::DirectMono(b) => b.program(pattern),
            Self::EngineMono(b) | Self::EngineRgb(b) => b.program(pattern),
            Self::RgbShim(b) => b.program(pattern),
        }
    }

    fn disable(&mut self) {
        match self {
            Self::None => {}
            Self::DirectMono(b) => b.disable(),
            Self::EngineMono(b) | Self::EngineRgb(b) => b.disable(),
            Self::RgbShim(b) => b.disable(),
        }
    }

    fn set_brightness(&mut self, level: Brightness) {
        match self {
            Self::None => {}
            Self::DirectMono(b) => b.set_brightness(level),
            Self::EngineMono(b) | Self::EngineRgb(b) => b.set_brightness(level),
            Self::RgbShim(b) => b.set_brightness(level),
        }
    }

    fn supports_sw_breathing(&self) -> bool {
        match self {
            Self::RgbShim(b) => b.supports_sw_breathing(),
            _ => false,
        }
    }

    fn set_sw_breathing(&mut self, enable: bool) {
        if let Self::RgbShim(b) = self {
            b.set_sw_breathing(enable);
        }
    }

    fn quiesce(&mut self) {
        match self {
            Self::None => {}
            Self::DirectMono(b) => b.quiesce(),
            Self::EngineMono(b) | Self::EngineRgb(b) => b.quiesce(),
            Self::RgbShim(b) => b.quiesce(),
        }
    }
}
