//! 74HC165 parallel-in/serial-out shift register driver.
//!
//! ## Wiring
//!
//! | Chip pin      | Role                 | Host line direction          |
//! |---------------|----------------------|------------------------------|
//! | 9  (Q7)       | serial data out      | input, pull-down             |
//! | 2  (CP)       | clock                | output, idles low            |
//! | 15 (CE)       | clock enable (low)   | output, held low             |
//! | 1  (PL)       | parallel load (low)  | output, idles high           |
//!
//! ## Read protocol
//!
//! 1. Pulse PL low then high: the chip copies its parallel inputs into
//!    the shift stage and goes back to shift mode.
//! 2. `bit_count` times: sample Q7, then pulse CP high then low.  Q7
//!    presents the most-significant remaining bit *before* each pulse.
//! 3. Reverse the samples so index 0 is the first parallel input.
//!
//! No delay is inserted between pin writes; the provider's call latency
//! has to cover the chip's minimum pulse widths.

use log::{debug, error, info};

use crate::bits::BitSequence;
use crate::config::{DriverConfig, MAX_BITS};
use crate::error::Result;
use crate::ports::{Bias, DigitalIo, Direction, PinState};

/// Owns a [`DigitalIo`] provider and the four lines of one register chain.
///
/// Lines are claimed in [`new`](Self::new) and released exactly once,
/// either by [`release`](Self::release) or when the driver is dropped
/// (including during unwinding).
pub struct RegisterDriver<IO: DigitalIo> {
    io: IO,
    config: DriverConfig,
    released: bool,
}

impl<IO: DigitalIo> RegisterDriver<IO> {
    /// Claim and configure the lines, then drive the idle levels:
    /// clock low, clock enable low, parallel load high.
    ///
    /// If any line cannot be claimed, lines claimed so far are released
    /// before the error is returned.
    pub fn new(io: IO, config: DriverConfig) -> Result<Self> {
        config.validate()?;

        let mut driver = Self {
            io,
            config,
            released: false,
        };
        driver.io.set_warnings(!driver.config.suppress_warnings);
        // On error the early return drops `driver`, releasing the lines.
        driver.setup_lines()?;

        info!(
            "shiftreg: driver ready (data={}, load={}, ce={}, clk={}, bits={})",
            driver.config.serial_data,
            driver.config.parallel_load,
            driver.config.clock_enable,
            driver.config.clock,
            driver.config.bit_count
        );
        Ok(driver)
    }

    fn setup_lines(&mut self) -> Result<()> {
        let c = &self.config;
        self.io.configure_line(c.serial_data, Direction::Input, Bias::PullDown)?;
        self.io.configure_line(c.clock, Direction::Output, Bias::None)?;
        self.io.configure_line(c.clock_enable, Direction::Output, Bias::None)?;
        self.io.configure_line(c.parallel_load, Direction::Output, Bias::None)?;

        self.io.write_line(c.clock, PinState::Low)?;
        self.io.write_line(c.clock_enable, PinState::Low)?;
        self.io.write_line(c.parallel_load, PinState::High)?;
        Ok(())
    }

    /// Latch and shift out the whole chain.
    ///
    /// Any I/O fault abandons the read; the partially shifted data is
    /// discarded.  A later `read()` starts over with a fresh latch.
    pub fn read(&mut self) -> Result<BitSequence> {
        match self.shift_in() {
            Ok(reading) => {
                debug!("shiftreg: read 0x{:0width$x}", reading.to_bits(), width = self.config.bit_count.div_ceil(4));
                Ok(reading)
            }
            Err(e) => {
                error!("shiftreg: read aborted: {e}");
                Err(e)
            }
        }
    }

    fn shift_in(&mut self) -> Result<BitSequence> {
        self.latch()?;

        // `new` validated the config, so the buffer never fills up.
        debug_assert!(self.config.bit_count <= MAX_BITS);
        let mut bits = heapless::Vec::<bool, MAX_BITS>::new();
        for _ in 0..self.config.bit_count {
            let level = self.io.read_line(self.config.serial_data)?;
            let pushed = bits.push(level == PinState::High);
            debug_assert!(pushed.is_ok());
            self.pulse_clock()?;
        }

        // Samples arrive last-input-first; flip to index 0 = first input.
        bits.reverse();
        Ok(BitSequence::from_vec(bits))
    }

    /// PL low then high, as two separate writes.
    fn latch(&mut self) -> Result<()> {
        self.io.write_line(self.config.parallel_load, PinState::Low)?;
        self.io.write_line(self.config.parallel_load, PinState::High)?;
        Ok(())
    }

    /// CP high then low: one bit advances toward Q7.
    fn pulse_clock(&mut self) -> Result<()> {
        self.io.write_line(self.config.clock, PinState::High)?;
        self.io.write_line(self.config.clock, PinState::Low)?;
        Ok(())
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn bit_count(&self) -> usize {
        self.config.bit_count
    }

    /// Release all lines now.
    pub fn release(mut self) {
        self.release_lines();
    }

    fn release_lines(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.io.release_all();
        info!("shiftreg: lines released");
    }
}

impl<IO: DigitalIo> Drop for RegisterDriver<IO> {
    fn drop(&mut self) {
        self.release_lines();
    }
}
