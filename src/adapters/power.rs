//! Suspend-blocker adapter.
//!
//! Holds a named kernel wake lock while software breathing animates.
//! Acquire and release are idempotent, and the hold is released on drop so
//! no exit path can leave the device pinned awake.

use crate::adapters::sysfs::SysfsFile;
use crate::app::ports::PowerHoldPort;

pub struct WakeLockHold {
    lock: SysfsFile,
    unlock: SysfsFile,
    tag: &'static str,
    held: bool,
}

impl WakeLockHold {
    /// Standard kernel paths.
    pub fn kernel_default(tag: &'static str) -> Self {
        Self::at("/sys/power/wake_lock", "/sys/power/wake_unlock", tag)
    }

    pub fn at(
        lock_path: impl Into<std::path::PathBuf>,
        unlock_path: impl Into<std::path::PathBuf>,
        tag: &'static str,
    ) -> Self {
        Self {
            lock: SysfsFile::new(lock_path),
            unlock: SysfsFile::new(unlock_path),
            tag,
            held: false,
        }
    }

    pub fn held(&self) -> bool {
        self.held
    }
}

impl PowerHoldPort for WakeLockHold {
    fn acquire(&mut self) {
        if !self.held {
            self.lock.write(self.tag);
            self.held = true;
        }
    }

    fn release(&mut self) {
        if self.held {
            self.unlock.write(self.tag);
            self.held = false;
        }
    }
}

impl Drop for WakeLockHold {
    fn drop(&mut self) {
        self.release();
    }
}
