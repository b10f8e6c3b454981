//! Control-pipe command surface.
//!
//! The daemon's inbound side is a line protocol on a FIFO: one request per
//! line, lower-case verbs, whitespace separated.  The parser is plain and
//! transport-agnostic; the `linux-hw` half below feeds it from a
//! non-blocking named pipe the way a bus adapter would feed it from method
//! calls.
//!
//! ```text
//! activate PatternBatteryFull
//! display off
//! battery 95
//! stop
//! ```

use crate::app::commands::LedCommand;
use crate::arbiter::{ChargerState, DisplayState, SystemState};

/// One parsed control line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlRequest {
    Command(LedCommand),
    /// Terminate the daemon.
    Stop,
}

/// Parse one line; `None` for anything unrecognised.
pub fn parse_line(line: &str) -> Option<ControlRequest> {
    let mut words = line.split_whitespace();
    let verb = words.next()?;
    let arg = words.next();
    if words.next().is_some() {
        return None;
    }

    let cmd = match (verb, arg) {
        ("activate", Some(name)) => LedCommand::Activate(name.to_string()),
        ("deactivate", Some(name)) => LedCommand::Deactivate(name.to_string()),
        ("enable", None) => LedCommand::EnableLed,
        ("disable", None) => LedCommand::DisableLed,
        ("display", Some(state)) => LedCommand::DisplayState(match state {
            "on" => DisplayState::On,
            "dim" => DisplayState::Dim,
            "off" => DisplayState::Off,
            "lpm-on" => DisplayState::LpmOn,
            "lpm-off" => DisplayState::LpmOff,
            "power-up" => DisplayState::PowerUp,
            "power-down" => DisplayState::PowerDown,
            _ => return None,
        }),
        ("system", Some(state)) => LedCommand::SystemState(match state {
            "user" => SystemState::User,
            "actdead" => SystemState::ActDead,
            "shutdown" => SystemState::Shutdown,
            "reboot" => SystemState::Reboot,
            _ => return None,
        }),
        ("charger", Some(state)) => LedCommand::ChargerState(match state {
            "on" => ChargerState::On,
            "off" => ChargerState::Off,
            _ => return None,
        }),
        ("battery", Some(pct)) => LedCommand::BatteryLevel(pct.parse().ok()?),
        ("activity", None) => LedCommand::UserActivity,
        ("brightness", Some(step)) => LedCommand::LedBrightness(step.parse().ok()?),
        ("breathing", Some("on")) => LedCommand::SetSwBreathing(true),
        ("breathing", Some("off")) => LedCommand::SetSwBreathing(false),
        ("breath-limit", Some(pct)) => LedCommand::SetBreathBatteryLimit(pct.parse().ok()?),
        ("pattern-on", Some(name)) => LedCommand::SetPatternEnabled(name.to_string(), true),
        ("pattern-off", Some(name)) => LedCommand::SetPatternEnabled(name.to_string(), false),
        ("stop", None) => return Some(ControlRequest::Stop),
        _ => return None,
    };
    Some(ControlRequest::Command(cmd))
}

#[cfg(feature = "linux-hw")]
pub use pipe::ControlPipe;

#[cfg(feature = "linux-hw")]
mod pipe {
    use std::fs::File;
    use std::io::Read;
    use std::os::unix::fs::OpenOptionsExt;
    use std::path::Path;

    use log::{debug, info, warn};

    use super::{parse_line, ControlRequest};

    /// Non-blocking FIFO reader.  Partial lines are buffered across polls.
    pub struct ControlPipe {
        file: File,
        buffer: String,
    }

    impl ControlPipe {
        /// Create (if needed) and open the FIFO without blocking on a
        /// writer.
        pub fn open(path: &Path) -> std::io::Result<Self> {
            if !path.exists() {
                let cpath = std::ffi::CString::new(path.as_os_str().as_encoded_bytes())
                    .map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidInput))?;
                // SAFETY: cpath is a valid NUL-terminated path for the call.
                let rc = unsafe { libc::mkfifo(cpath.as_ptr(), 0o622) };
                if rc != 0 {
                    return Err(std::io::Error::last_os_error());
                }
            }
            let file = std::fs::OpenOptions::new()
                .read(true)
                .custom_flags(libc::O_NONBLOCK)
                .open(path)?;
            info!("control pipe at {}", path.display());
            Ok(Self { file, buffer: String::new() })
        }

        /// Drain whatever is readable right now into parsed requests.
        pub fn poll(&mut self) -> Vec<ControlRequest> {
            let mut chunk = [0u8; 512];
            loop {
                match self.file.read(&mut chunk) {
                    Ok(0) => break, // no writer connected
                    Ok(n) => self.buffer.push_str(&String::from_utf8_lossy(&chunk[..n])),
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                    Err(e) => {
                        warn!("control pipe read failed: {e}");
                        break;
                    }
                }
            }

            let mut requests = Vec::new();
            while let Some(pos) = self.buffer.find('\n') {
                let line: String = self.buffer.drain(..=pos).collect();
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match parse_line(line) {
                    Some(req) => requests.push(req),
                    None => debug!("control pipe: unrecognised line '{line}'"),
                }
            }
            requests
        }
    }
}
