//! Sysfs attribute writer.
//!
//! Kernel attribute files want a fresh open-truncate-write per value; a
//! held-open descriptor would append or keep stale state.  The path itself
//! stays resident for the process lifetime so repeated writes cost no
//! allocation or lookup logic.  Failures are logged and reported as a bool
//! — a missing LED must never take the arbitration core down.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::warn;

/// One writable sysfs attribute.
pub struct SysfsFile {
    path: PathBuf,
}

impl SysfsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Write one value: open on demand, truncate, write, close.
    pub fn write(&self, value: &str) -> bool {
        let result = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
            .and_then(|mut f| f.write_all(value.as_bytes()));
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("sysfs write {} <- '{value}' failed: {e}", self.path.display());
                false
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
