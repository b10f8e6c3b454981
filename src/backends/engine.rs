//! I²C engine-controller backends.
//!
//! Two register-map families share one driver: family A is the classic
//! fixed-wiring three-channel controller (engine n drives channel n),
//! family B separates execution from mode control and routes LEDs to its
//! two engines through mux registers.  Both run the same on-chip bytecode
//! concept: per engine, halt it, switch it to load mode, stream the
//! program bytes into its program memory, then set it running.  Engines
//! are started in reverse order so the highest-numbered engine never runs
//! against a half-loaded sibling.
//!
//! Brightness is a current adjustment, not a reprogram.  For RGB use the
//! raw level is hue-corrected: pure red needs a large boost against green
//! to read as orange, and a smaller one against green+blue (white) or
//! blue (purple).

use embedded_hal::i2c::I2c;
use log::warn;

use crate::app::ports::{BackendPort, Brightness};
use crate::arbiter::MAX_BRIGHTNESS_STEP;
use crate::patterns::{Pattern, ProgramString};

/// Decoded engine program: 64 hex chars = 32 bytes.
type ProgramBytes = heapless::Vec<u8, 32>;

// Per-engine 2-bit operation modes.
const MODE_DISABLED: u8 = 0b00;
const MODE_LOAD: u8 = 0b01;
const MODE_RUN: u8 = 0b10;

/// Chip master-enable bit in the enable register.
const CHIP_EN: u8 = 0x40;

/// LED wiring of the muxed family: which mux bits mean which colour.
const MUX_RED: u8 = 0x01;
const MUX_GREEN: u8 = 0x02;
const MUX_BLUE: u8 = 0x04;

/// Bit position of engine `e`'s 2-bit field (engine 0 is the topmost).
fn field_shift(engine: usize) -> u8 {
    (4 - 2 * engine) as u8
}

fn set_field(shadow: u8, engine: usize, mode: u8) -> u8 {
    let shift = field_shift(engine);
    (shadow & !(0b11 << shift)) | (mode << shift)
}

// ───────────────────────────────────────────────────────────────
// Register maps
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFamily {
    /// Fixed wiring, exec folded into the enable register.
    A,
    /// Separate exec register, two engines, LED mux.
    B,
}

struct RegisterMap {
    enable: u8,
    op_mode: u8,
    /// Exec register; family A folds this into `enable`.
    exec: u8,
    current: [u8; 3],
    prog_mem: [u8; 3],
    mux: Option<[u8; 2]>,
}

const FAMILY_A: RegisterMap = RegisterMap {
    enable: 0x00,
    op_mode: 0x01,
    exec: 0x00,
    current: [0x05, 0x06, 0x07],
    prog_mem: [0x10, 0x30, 0x50],
    mux: None,
};

const FAMILY_B: RegisterMap = RegisterMap {
    enable: 0x00,
    op_mode: 0x02,
    exec: 0x01,
    current: [0x26, 0x27, 0x28],
    prog_mem: [0x50, 0x60, 0x70],
    mux: Some([0x30, 0x31]),
};

impl EngineFamily {
    fn regs(self) -> &'static RegisterMap {
        match self {
            Self::A => &FAMILY_A,
            Self::B => &FAMILY_B,
        }
    }
}

/// Whether the controller drives one LED or the RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    Mono,
    Rgb,
}

// ───────────────────────────────────────────────────────────────
// Driver
// ───────────────────────────────────────────────────────────────

pub struct EngineBackend<I> {
    bus: I,
    addr: u8,
    family: EngineFamily,
    mode: EngineMode,
    /// Global display-tracking step, `1..=MAX_BRIGHTNESS_STEP`.
    level: u8,
    /// Which colour channels the installed pattern lights, for hue
    /// correction.
    lit: [bool; 3],
}

impl<I: I2c> EngineBackend<I> {
    pub fn new(bus: I, addr: u8, family: EngineFamily, mode: EngineMode) -> Self {
        Self { bus, addr, family, mode, level: MAX_BRIGHTNESS_STEP, lit: [false; 3] }
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), I::Error> {
        self.bus.write(self.addr, &[reg, value])
    }

    /// Stream program bytes into an engine's program memory in one
    /// transfer: register address followed by the payload.
    fn write_program(&mut self, base: u8, bytes: &[u8]) -> Result<(), I::Error> {
        let mut buf = heapless::Vec::<u8, 33>::new();
        // Capacity holds the base register plus a full 32-byte program.
        let _ = buf.push(base);
        let _ = buf.extend_from_slice(bytes);
        self.bus.write(self.addr, &buf)
    }

    /// Engines the pattern uses: `(engine, program, mux mask)`.
    fn plan(&self, p: &Pattern) -> Vec<(usize, ProgramBytes, Option<u8>)> {
        let mut plan = Vec::new();
        match (self.mode, self.family) {
            (EngineMode::Mono, _) => {
                if let Some(bytes) = decode_program(&p.channels[0]) {
                    plan.push((0, bytes, None));
                }
            }
            (EngineMode::Rgb, EngineFamily::A) => {
                for (engine, channel) in p.channels.iter().enumerate() {
                    if let Some(bytes) = decode_program(channel) {
                        plan.push((engine, bytes, None));
                    }
                }
            }
            (EngineMode::Rgb, EngineFamily::B) => {
                for (engine, (channel, mux)) in p
                    .channels
                    .iter()
                    .zip([p.engine1_mux, p.engine2_mux])
                    .enumerate()
                {
                    if let Some(bytes) = decode_program(channel) {
                        plan.push((engine, bytes, Some(mux)));
                    }
                }
            }
        }
        plan
    }

    fn lit_channels(&self, p: &Pattern) -> [bool; 3] {
        match (self.mode, self.family) {
            (EngineMode::Mono, _) => [!p.channels[0].is_empty(), false, false],
            (EngineMode::Rgb, EngineFamily::A) => {
                [!p.channels[0].is_empty(), !p.channels[1].is_empty(), !p.channels[2].is_empty()]
            }
            (EngineMode::Rgb, EngineFamily::B) => {
                let mask = p.engine1_mux | p.engine2_mux;
                [mask & MUX_RED != 0, mask & MUX_GREEN != 0, mask & MUX_BLUE != 0]
            }
        }
    }

    fn install(&mut self, p: &Pattern) -> Result<(), I::Error> {
        let regs = self.family.regs();
        let plan = self.plan(p);

        // Chip on, every engine halted, modes cleared.
        self.write_reg(regs.enable, CHIP_EN)?;
        self.write_reg(regs.op_mode, 0x00)?;

        let mut shadow = 0u8;
        for (engine, bytes, mux) in &plan {
            shadow = set_field(shadow, *engine, MODE_LOAD);
            self.write_reg(regs.op_mode, shadow)?;
            self.write_program(regs.prog_mem[*engine], bytes)?;
            if let (Some(mux_regs), Some(mask)) = (regs.mux.as_ref(), mux) {
                self.write_reg(mux_regs[*engine], *mask)?;
            }
        }

        // Reverse-order start.
        for (engine, _, _) in plan.iter().rev() {
            shadow = set_field(shadow, *engine, MODE_RUN);
            self.write_reg(regs.op_mode, shadow)?;
        }
        let exec = match self.family {
            EngineFamily::A => CHIP_EN | shadow,
            EngineFamily::B => shadow,
        };
        self.write_reg(regs.exec, exec)?;

        self.lit = self.lit_channels(p);
        self.apply_current()
    }

    /// Write the (hue-corrected) channel currents for the cached level.
    fn apply_current(&mut self) -> Result<(), I::Error> {
        let regs = self.family.regs();
        let v = (u32::from(self.level) * 255 / u32::from(MAX_BRIGHTNESS_STEP)) as u8;
        match self.mode {
            EngineMode::Mono => {
                let current = if self.lit[0] { v } else { 0 };
                self.write_reg(regs.current[0], current)
            }
            EngineMode::Rgb => {
                let (r, g, b) = hue_correct(v, self.lit);
                self.write_reg(regs.current[0], r)?;
                self.write_reg(regs.current[1], g)?;
                self.write_reg(regs.current[2], b)
            }
        }
    }

    fn halt(&mut self) -> Result<(), I::Error> {
        let regs = self.family.regs();
        self.write_reg(regs.op_mode, 0x00)?;
        let exec = match self.family {
            EngineFamily::A => CHIP_EN,
            EngineFamily::B => 0x00,
        };
        self.write_reg(regs.exec, exec)?;
        self.lit = [false; 3];
        self.apply_current()
    }
}

/// Hue correction for RGB current: boost red against the colours that
/// would otherwise wash it out.
fn hue_correct(v: u8, lit: [bool; 3]) -> (u8, u8, u8) {
    match lit {
        // White: red ×4, green and blue at a quarter.
        [true, true, true] => (v.saturating_mul(4), v / 4, v / 4),
        // Orange: red ×10 (saturating), green a tenth.
        [true, true, false] => (v.saturating_mul(10), v / 10, 0),
        // Purple: red ×4, blue a quarter.
        [true, false, true] => (v.saturating_mul(4), 0, v / 4),
        _ => (
            if lit[0] { v } else { 0 },
            if lit[1] { v } else { 0 },
            if lit[2] { v } else { 0 },
        ),
    }
}

/// Decode a validated hex program; `None` when the channel is unused.
fn decode_program(channel: &ProgramString) -> Option<ProgramBytes> {
    if channel.is_empty() {
        return None;
    }
    let mut bytes = ProgramBytes::new();
    for pair in channel.as_bytes().chunks(2) {
        let &[hi, lo] = pair else { return None };
        let hi = (hi as char).to_digit(16)?;
        let lo = (lo as char).to_digit(16)?;
        bytes.push((hi * 16 + lo) as u8).ok()?;
    }
    Some(bytes)
}

impl<I: I2c> BackendPort for EngineBackend<I> {
    fn program(&mut self, pattern: &Pattern) -> bool {
        match self.install(pattern) {
            Ok(()) => true,
            Err(e) => {
                warn!("engine controller: programming {} failed: {e:?}", pattern.name);
                false
            }
        }
    }

    fn disable(&mut self) {
        if let Err(e) = self.halt() {
            warn!("engine controller: disable failed: {e:?}");
        }
    }

    fn set_brightness(&mut self, level: Brightness) {
        if let Brightness::Level(step) = level {
            self.level = step.clamp(1, MAX_BRIGHTNESS_STEP);
        }
        if let Err(e) = self.apply_current() {
            warn!("engine controller: current update failed: {e:?}");
        }
    }
}
