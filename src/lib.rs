//! 74HC165 shift register driver with polled change detection.
//!
//! ```text
//!  DigitalIo adapter ──▶ RegisterDriver ──▶ ChangeWatcher ──▶ TransitionHandler
//!  (hal / sim / mock)    latch·shift·sample   diff·dispatch     (caller code)
//! ```
//!
//! The driver only ever talks to lines through the [`ports::DigitalIo`]
//! port, so the same code runs against `embedded-hal` pins, the
//! simulated chain, or a test mock.

pub mod adapters;
pub mod bits;
pub mod config;
pub mod drivers;
pub mod error;
pub mod ports;
pub mod watcher;

pub use bits::{BitSequence, PinIndex, TransitionSet, diff};
pub use config::{BITS_PER_CHIP, DriverConfig, MAX_BITS};
pub use drivers::piso::RegisterDriver;
pub use error::{Edge, Error, HandlerFault, IoFailure, IoSetupError, Result};
pub use watcher::{ChangeWatcher, StopHandle};
