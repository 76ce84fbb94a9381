//! Port traits: the boundary between the register protocol and the outside world.
//!
//! ```text
//!   DigitalIo adapter ──▶ RegisterDriver ──▶ ChangeWatcher ──▶ TransitionHandler
//! ```
//!
//! Driven adapters (real GPIO, the simulated chain, test mocks) implement
//! [`DigitalIo`].  Callers plug their reactions to bit changes in through
//! [`TransitionHandler`].  The driver and watcher consume both via
//! generics, so the core never touches a platform pin-addressing scheme.

use core::fmt;

pub use embedded_hal::digital::PinState;
use serde::{Deserialize, Serialize};

use crate::bits::PinIndex;
use crate::error::{IoFailure, IoSetupError};

// ───────────────────────────────────────────────────────────────
// Line identifiers
// ───────────────────────────────────────────────────────────────

/// Opaque identifier of one digital line, as understood by the provider.
///
/// For a Linux/BCM-style provider this is the GPIO number; for
/// [`HalLines`](crate::adapters::hal::HalLines) it only has to match the
/// ids in the [`DriverConfig`](crate::config::DriverConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(pub u32);

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Internal resistor bias for an input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    None,
    PullUp,
    PullDown,
}

// ───────────────────────────────────────────────────────────────
// Digital I/O port (driven adapter: driver ↔ hardware)
// ───────────────────────────────────────────────────────────────

/// Claim, drive, sample and release individual digital lines.
///
/// An instance is an explicit I/O provider handed to one
/// [`RegisterDriver`](crate::drivers::piso::RegisterDriver); there is no
/// process-wide claim table.
pub trait DigitalIo {
    /// Claim `id` and set its direction and bias.
    fn configure_line(&mut self, id: LineId, direction: Direction, bias: Bias) -> Result<(), IoSetupError>;

    /// Drive an output line.
    fn write_line(&mut self, id: LineId, level: PinState) -> Result<(), IoFailure>;

    /// Sample an input line.
    fn read_line(&mut self, id: LineId) -> Result<PinState, IoFailure>;

    /// Release every line this provider has claimed.  Must be idempotent.
    fn release_all(&mut self);

    /// Enable or silence provider-level warnings (e.g. re-claiming a line).
    fn set_warnings(&mut self, _enabled: bool) {}
}

impl<T: DigitalIo + ?Sized> DigitalIo for &mut T {
    fn configure_line(&mut self, id: LineId, direction: Direction, bias: Bias) -> Result<(), IoSetupError> {
        (**self).configure_line(id, direction, bias)
    }

    fn write_line(&mut self, id: LineId, level: PinState) -> Result<(), IoFailure> {
        (**self).write_line(id, level)
    }

    fn read_line(&mut self, id: LineId) -> Result<PinState, IoFailure> {
        (**self).read_line(id)
    }

    fn release_all(&mut self) {
        (**self).release_all();
    }

    fn set_warnings(&mut self, enabled: bool) {
        (**self).set_warnings(enabled);
    }
}

// ───────────────────────────────────────────────────────────────
// Transition handler (driving adapter: watcher → caller)
// ───────────────────────────────────────────────────────────────

/// Reaction to single-bit changes reported by a
/// [`ChangeWatcher`](crate::watcher::ChangeWatcher).
///
/// Within one polling cycle every `went_high` call happens before any
/// `went_low` call, each group in ascending pin order.
pub trait TransitionHandler {
    fn went_high(&mut self, pin: PinIndex);

    fn went_low(&mut self, pin: PinIndex);
}

/// Handler assembled from two closures, one per edge.
pub struct FnHandler<H, L> {
    on_high: H,
    on_low: L,
}

impl<H, L> FnHandler<H, L>
where
    H: FnMut(PinIndex),
    L: FnMut(PinIndex),
{
    pub fn new(on_high: H, on_low: L) -> Self {
        Self { on_high, on_low }
    }
}

impl<H, L> TransitionHandler for FnHandler<H, L>
where
    H: FnMut(PinIndex),
    L: FnMut(PinIndex),
{
    fn went_high(&mut self, pin: PinIndex) {
        (self.on_high)(pin);
    }

    fn went_low(&mut self, pin: PinIndex) {
        (self.on_low)(pin);
    }
}

impl<T: TransitionHandler + ?Sized> TransitionHandler for &mut T {
    fn went_high(&mut self, pin: PinIndex) {
        (**self).went_high(pin);
    }

    fn went_low(&mut self, pin: PinIndex) {
        (**self).went_low(pin);
    }
}

impl<T: TransitionHandler + ?Sized> TransitionHandler for Box<T> {
    fn went_high(&mut self, pin: PinIndex) {
        (**self).went_high(pin);
    }

    fn went_low(&mut self, pin: PinIndex) {
        (**self).went_low(pin);
    }
}
