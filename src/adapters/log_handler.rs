//! Log-based transition handler.
//!
//! The default [`TransitionHandler`] for a
//! [`ChangeWatcher`](crate::watcher::ChangeWatcher): every transition goes
//! to the `log` facade and nothing else happens.  Real callers swap in
//! their own handler.

use log::info;

use crate::bits::PinIndex;
use crate::ports::TransitionHandler;

/// Handler that logs every transition.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHandler;

impl LogHandler {
    pub fn new() -> Self {
        Self
    }
}

impl TransitionHandler for LogHandler {
    fn went_high(&mut self, pin: PinIndex) {
        info!("EDGE | pin {} went HIGH", pin);
    }

    fn went_low(&mut self, pin: PinIndex) {
        info!("EDGE | pin {} went LOW", pin);
    }
}
