//! Outbound signals.
//!
//! The core announces pattern activation changes through the
//! [`SignalSink`](super::ports::SignalSink) port.  A signal fires on every
//! flip of a pattern's `active` bit while that pattern is enabled — even
//! when the pattern loses arbitration and never reaches the LED — and it
//! fires *before* the arbiter re-evaluates, so observers always hear about
//! the activation before they can see the hardware change.

/// Announcements emitted on the signal bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedSignal {
    /// A pattern's `active` bit became true while it was enabled.
    PatternActivated(String),
    /// A pattern's `active` bit became false while it was enabled.
    PatternDeactivated(String),
}

impl LedSignal {
    /// The pattern the signal is about.
    pub fn pattern(&self) -> &str {
        match self {
            Self::PatternActivated(name) | Self::PatternDeactivated(name) => name,
        }
    }
}
