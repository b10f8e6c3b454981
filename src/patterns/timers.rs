//! Auto-deactivate deadlines.
//!
//! One optional deadline per pattern, expressed on the boot-time monotonic
//! clock so a delay keeps accruing while the device is suspended.  The main
//! loop asks for the earliest deadline to size its sleep, then collects
//! whatever has expired when it wakes.

use std::time::Duration;

/// Deadline table parallel to the pattern repository.
pub struct DeactivateTimers {
    deadlines: Vec<Option<Duration>>,
}

impl DeactivateTimers {
    pub fn new(patterns: usize) -> Self {
        Self { deadlines: vec![None; patterns] }
    }

    /// Arm (or re-arm) the deadline for a pattern.
    pub fn start(&mut self, idx: usize, deadline: Duration) {
        self.deadlines[idx] = Some(deadline);
    }

    pub fn cancel(&mut self, idx: usize) {
        self.deadlines[idx] = None;
    }

    pub fn cancel_all(&mut self) {
        self.deadlines.fill(None);
    }

    pub fn is_armed(&self, idx: usize) -> bool {
        self.deadlines[idx].is_some()
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.deadlines.iter().flatten().copied().min()
    }

    /// Disarm and return every pattern whose deadline has passed.
    pub fn take_expired(&mut self, now: Duration) -> Vec<usize> {
        let mut expired = Vec::new();
        for (idx, slot) in self.deadlines.iter_mut().enumerate() {
            if slot.is_some_and(|d| d <= now) {
                *slot = None;
                expired.push(idx);
            }
        }
        expired
    }
}
