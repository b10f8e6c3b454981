//! Log-backed signal sink.
//!
//! Stand-in for the bus signal emitter: announces every activation change
//! on the log.  A transport adapter replaces this on devices with a real
//! signal bus; send failures stay on its side of the port either way.

use log::info;

use crate::app::events::LedSignal;
use crate::app::ports::SignalSink;

pub struct LogSignalSink;

impl SignalSink for LogSignalSink {
    fn emit(&mut self, signal: &LedSignal) {
        match signal {
            LedSignal::PatternActivated(name) => info!("signal: pattern_activated {name}"),
            LedSignal::PatternDeactivated(name) => info!("signal: pattern_deactivated {name}"),
        }
    }
}
