//! Unified error types for the shift register driver.
//!
//! A single [`Error`] enum that every layer converts into, so callers can
//! tell "could not claim hardware" apart from "hardware faulted mid-read"
//! apart from "a transition handler failed during dispatch".

use core::fmt;

use crate::bits::PinIndex;
use crate::ports::LineId;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A line could not be claimed or configured at initialization.
    Setup(IoSetupError),
    /// A read or write on an already-configured line faulted.
    Io(IoFailure),
    /// A transition handler failed while a diff was being dispatched.
    Handler(HandlerFault),
    /// Driver configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup(e) => write!(f, "setup: {e}"),
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Handler(e) => write!(f, "handler: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Setup errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoSetupError {
    /// The I/O subsystem does not have (or will not hand out) this line.
    LineUnavailable(LineId),
    /// The line cannot be used in the requested direction.
    DirectionUnsupported(LineId),
    /// The provider has already released its lines.
    Released,
}

impl fmt::Display for IoSetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LineUnavailable(id) => write!(f, "line {id} unavailable"),
            Self::DirectionUnsupported(id) => write!(f, "line {id} cannot take that direction"),
            Self::Released => write!(f, "I/O provider already released"),
        }
    }
}

impl std::error::Error for IoSetupError {}

impl From<IoSetupError> for Error {
    fn from(e: IoSetupError) -> Self {
        Self::Setup(e)
    }
}

// ---------------------------------------------------------------------------
// Runtime I/O failures
// ---------------------------------------------------------------------------

/// A fault on a configured line. Always fatal to the in-progress read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoFailure {
    ReadFailed(LineId),
    WriteFailed(LineId),
    /// The line was never configured through this provider.
    Unclaimed(LineId),
    /// The provider has already released its lines.
    Released,
}

impl fmt::Display for IoFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed(id) => write!(f, "read of line {id} failed"),
            Self::WriteFailed(id) => write!(f, "write to line {id} failed"),
            Self::Unclaimed(id) => write!(f, "line {id} was never claimed"),
            Self::Released => write!(f, "I/O provider already released"),
        }
    }
}

impl std::error::Error for IoFailure {}

impl From<IoFailure> for Error {
    fn from(e: IoFailure) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Handler faults
// ---------------------------------------------------------------------------

/// Direction of a single-bit transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Low to high.
    Rising,
    /// High to low.
    Falling,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rising => write!(f, "high"),
            Self::Falling => write!(f, "low"),
        }
    }
}

/// Longest panic message kept in a [`HandlerFault`]; the rest is cut.
pub const FAULT_DETAIL_LEN: usize = 64;

/// A transition handler panicked. Caught at the dispatch boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFault {
    pub pin: PinIndex,
    pub edge: Edge,
    pub detail: heapless::String<FAULT_DETAIL_LEN>,
}

impl HandlerFault {
    pub fn new(pin: PinIndex, edge: Edge, message: &str) -> Self {
        let mut detail = heapless::String::new();
        for ch in message.chars() {
            if detail.push(ch).is_err() {
                break;
            }
        }
        Self { pin, edge, detail }
    }
}

impl fmt::Display for HandlerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "went-{} handler for pin {} failed: {}", self.edge, self.pin, self.detail)
    }
}

impl std::error::Error for HandlerFault {}

impl From<HandlerFault> for Error {
    fn from(e: HandlerFault) -> Self {
        Self::Handler(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
