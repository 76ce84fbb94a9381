//! Simulated 74HC165 chain: a software stand-in for real lines.
//!
//! Implements [`DigitalIo`] by modelling the chip itself, so the driver's
//! pin sequencing has to be right for readings to come out right:
//!
//! - PL low copies the parallel inputs into the shift stage (and keeps
//!   copying while it stays low).
//! - A CP rising edge shifts the stage one place toward Q7 when CE is low
//!   and PL is high; the serial input (DS of the last package) shifts in.
//! - Q7 is the highest stored bit, i.e. the last parallel input.
//!
//! Parallel inputs are held in a shared [`SimHandle`] so a test, or
//! another thread, can change them between reads.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, warn};

use crate::config::{DriverConfig, MAX_BITS};
use crate::error::{IoFailure, IoSetupError};
use crate::ports::{Bias, DigitalIo, Direction, LineId, PinState};

/// One call made against the simulated lines, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoCall {
    Configure { id: LineId, direction: Direction, bias: Bias },
    Write { id: LineId, level: PinState },
    Read { id: LineId, level: PinState },
    ReleaseAll,
}

/// Shared view of a [`SimulatedChain`]: parallel inputs in, trace out.
#[derive(Debug, Clone, Default)]
pub struct SimHandle {
    inputs: Arc<AtomicU64>,
    releases: Arc<AtomicUsize>,
    trace: Arc<Mutex<Vec<IoCall>>>,
}

impl SimHandle {
    /// Set every parallel input at once; bit `i` drives input `i`.
    pub fn set_inputs(&self, bits: u64) {
        self.inputs.store(bits, Ordering::Release);
    }

    /// Drive one parallel input; pins past [`MAX_BITS`] are ignored.
    pub fn set_input(&self, pin: usize, high: bool) {
        if pin >= MAX_BITS {
            warn!("sim: input {pin} is outside the chain, ignored");
            return;
        }
        let mask = 1u64 << pin;
        if high {
            self.inputs.fetch_or(mask, Ordering::AcqRel);
        } else {
            self.inputs.fetch_and(!mask, Ordering::AcqRel);
        }
    }

    pub fn inputs(&self) -> u64 {
        self.inputs.load(Ordering::Acquire)
    }

    /// How many times `release_all` has been called.
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::Acquire)
    }

    /// Every call made so far.
    pub fn trace(&self) -> Vec<IoCall> {
        self.trace.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn clear_trace(&self) {
        self.trace.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn record(&self, call: IoCall) {
        self.trace.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }
}

#[derive(Debug, Clone, Copy)]
struct Claim {
    id: LineId,
    direction: Direction,
    level: PinState,
}

/// In-process model of a daisy-chained 74HC165 register.
pub struct SimulatedChain {
    data: LineId,
    load: LineId,
    clock_enable: LineId,
    clock: LineId,
    width: usize,
    serial_in: PinState,
    stage: u64,
    claims: heapless::Vec<Claim, 8>,
    unavailable: heapless::Vec<LineId, 8>,
    released: bool,
    warnings: bool,
    handle: SimHandle,
}

impl SimulatedChain {
    /// A chain wired and sized exactly as `config` describes.
    pub fn new(config: &DriverConfig) -> Self {
        Self {
            data: config.serial_data,
            load: config.parallel_load,
            clock_enable: config.clock_enable,
            clock: config.clock,
            width: config.bit_count,
            serial_in: PinState::Low,
            stage: 0,
            claims: heapless::Vec::new(),
            unavailable: heapless::Vec::new(),
            released: false,
            warnings: false,
            handle: SimHandle::default(),
        }
    }

    /// Level tied to DS of the last package, shifted in behind the data.
    pub fn with_serial_in(mut self, level: PinState) -> Self {
        self.serial_in = level;
        self
    }

    /// Refuse to hand out `id`, as if another process held it.
    pub fn with_unavailable_line(mut self, id: LineId) -> Self {
        let _ = self.unavailable.push(id);
        self
    }

    pub fn handle(&self) -> SimHandle {
        self.handle.clone()
    }

    fn mask(&self) -> u64 {
        if self.width >= 64 { u64::MAX } else { (1u64 << self.width) - 1 }
    }

    fn claim(&self, id: LineId) -> Option<&Claim> {
        self.claims.iter().find(|c| c.id == id)
    }

    fn level_of(&self, id: LineId) -> PinState {
        self.claim(id).map_or(PinState::Low, |c| c.level)
    }

    fn load_parallel(&mut self) {
        self.stage = self.handle.inputs() & self.mask();
    }

    fn shift(&mut self) {
        let incoming = u64::from(self.serial_in == PinState::High);
        self.stage = ((self.stage << 1) | incoming) & self.mask();
    }

    fn q7(&self) -> PinState {
        let top = self.width.saturating_sub(1);
        PinState::from((self.stage >> top) & 1 == 1)
    }
}

impl DigitalIo for SimulatedChain {
    fn configure_line(&mut self, id: LineId, direction: Direction, bias: Bias) -> Result<(), IoSetupError> {
        if self.released {
            return Err(IoSetupError::Released);
        }
        let wired = [self.data, self.load, self.clock_enable, self.clock].contains(&id);
        if !wired || self.unavailable.contains(&id) {
            return Err(IoSetupError::LineUnavailable(id));
        }
        // Q7 is the chip's only output; every other wired line is a chip input.
        if (id == self.data) != (direction == Direction::Input) {
            return Err(IoSetupError::DirectionUnsupported(id));
        }

        self.handle.record(IoCall::Configure { id, direction, bias });
        if let Some(existing) = self.claims.iter_mut().find(|c| c.id == id) {
            if self.warnings {
                warn!("sim: line {id} already claimed, reconfiguring");
            }
            existing.direction = direction;
            return Ok(());
        }
        // An unconnected input floats; a pull-down makes it read low.
        let _ = self.claims.push(Claim {
            id,
            direction,
            level: PinState::Low,
        });
        Ok(())
    }

    fn write_line(&mut self, id: LineId, level: PinState) -> Result<(), IoFailure> {
        if self.released {
            return Err(IoFailure::Released);
        }
        let previous = match self.claim(id) {
            Some(c) if c.direction == Direction::Output => c.level,
            Some(_) => return Err(IoFailure::WriteFailed(id)),
            None => return Err(IoFailure::Unclaimed(id)),
        };
        self.handle.record(IoCall::Write { id, level });
        if let Some(c) = self.claims.iter_mut().find(|c| c.id == id) {
            c.level = level;
        }

        if id == self.load && level == PinState::Low {
            self.load_parallel();
        } else if id == self.clock && previous == PinState::Low && level == PinState::High {
            let enabled = self.level_of(self.clock_enable) == PinState::Low;
            let shifting = self.level_of(self.load) == PinState::High;
            if enabled && shifting {
                self.shift();
            }
        }
        Ok(())
    }

    fn read_line(&mut self, id: LineId) -> Result<PinState, IoFailure> {
        if self.released {
            return Err(IoFailure::Released);
        }
        match self.claim(id) {
            Some(c) if c.direction == Direction::Input => {}
            Some(_) => return Err(IoFailure::ReadFailed(id)),
            None => return Err(IoFailure::Unclaimed(id)),
        }
        // While PL is low the stage tracks the inputs continuously.
        if self.level_of(self.load) == PinState::Low {
            self.load_parallel();
        }
        let level = self.q7();
        self.handle.record(IoCall::Read { id, level });
        Ok(level)
    }

    fn release_all(&mut self) {
        self.handle.record(IoCall::ReleaseAll);
        self.handle.releases.fetch_add(1, Ordering::AcqRel);
        if !self.released {
            debug!("sim: releasing {} lines", self.claims.len());
        }
        self.claims.clear();
        self.released = true;
    }

    fn set_warnings(&mut self, enabled: bool) {
        self.warnings = enabled;
    }
}
