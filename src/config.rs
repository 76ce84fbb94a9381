//! Driver configuration
//!
//! The four line ids wired to the register chain plus the chain's bit
//! width.  Set once at construction; a driver never mutates it.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ports::LineId;

/// Bits per 74HC165 package.
pub const BITS_PER_CHIP: usize = 8;

/// Widest supported chain (eight daisy-chained packages).
pub const MAX_BITS: usize = 64;

/// Wiring and width of one register chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Chip pin 9 (Q7, serial out), sampled by the host.
    pub serial_data: LineId,
    /// Chip pin 1 (PL, parallel load, active low).
    pub parallel_load: LineId,
    /// Chip pin 15 (CE, clock enable, active low). Held low.
    pub clock_enable: LineId,
    /// Chip pin 2 (CP, clock).
    pub clock: LineId,
    /// Total bits in the chain: 8 per chained package.
    #[serde(default = "default_bit_count")]
    pub bit_count: usize,
    /// Silence provider warnings such as re-claiming a line.
    #[serde(default = "default_suppress_warnings")]
    pub suppress_warnings: bool,
}

fn default_bit_count() -> usize {
    BITS_PER_CHIP
}

fn default_suppress_warnings() -> bool {
    true
}

impl DriverConfig {
    /// Single-package wiring with warnings suppressed.
    pub fn new(serial_data: LineId, parallel_load: LineId, clock_enable: LineId, clock: LineId) -> Self {
        Self {
            serial_data,
            parallel_load,
            clock_enable,
            clock,
            bit_count: default_bit_count(),
            suppress_warnings: default_suppress_warnings(),
        }
    }

    pub fn with_bit_count(mut self, bit_count: usize) -> Self {
        self.bit_count = bit_count;
        self
    }

    /// Width for `chips` daisy-chained packages.
    pub fn with_chips(self, chips: usize) -> Self {
        self.with_bit_count(chips * BITS_PER_CHIP)
    }

    pub fn with_warnings(mut self, enabled: bool) -> Self {
        self.suppress_warnings = !enabled;
        self
    }

    /// Lines in claim order: serial data, clock, clock enable, parallel load.
    pub fn lines(&self) -> [LineId; 4] {
        [self.serial_data, self.clock, self.clock_enable, self.parallel_load]
    }

    pub fn validate(&self) -> Result<()> {
        if self.bit_count == 0 {
            return Err(Error::Config("bit_count must be at least 1"));
        }
        if self.bit_count > MAX_BITS {
            return Err(Error::Config("bit_count exceeds MAX_BITS"));
        }

        let lines = self.lines();
        for (i, a) in lines.iter().enumerate() {
            if lines[i + 1..].contains(a) {
                return Err(Error::Config("two roles share one line"));
            }
        }
        Ok(())
    }
}
