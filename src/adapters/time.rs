//! Boot-time monotonic clock.
//!
//! Pattern timeouts must keep counting while the device sleeps, so the
//! clock reads `CLOCK_BOOTTIME` — monotonic like `CLOCK_MONOTONIC`, but it
//! includes time spent in suspend.

#![cfg(feature = "linux-hw")]

use std::time::Duration;

use log::warn;

use crate::app::ports::MonotonicClock;

pub struct BoottimeClock;

impl MonotonicClock for BoottimeClock {
    fn now(&self) -> Duration {
        let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
        // SAFETY: ts is a valid out-pointer for the duration of the call.
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_BOOTTIME, &mut ts) };
        if rc != 0 {
            // CLOCK_BOOTTIME exists on every kernel this daemon targets;
            // an error here means something far worse than a late timer.
            warn!("clock_gettime(CLOCK_BOOTTIME) failed: {}", std::io::Error::last_os_error());
            return Duration::ZERO;
        }
        Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
    }
}
