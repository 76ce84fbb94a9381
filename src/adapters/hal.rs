//! `embedded-hal` adapter: four HAL pins behind [`DigitalIo`].
//!
//! The platform HAL has already put each pin into the right mode (and
//! applied any bias) by the time it is handed over, so `configure_line`
//! only checks that the requested id and direction match the pin it was
//! given.  Line ids come from the [`DriverConfig`].

use embedded_hal::digital::{Error as _, InputPin, OutputPin};
use log::{debug, error, warn};

use crate::config::DriverConfig;
use crate::drivers::piso::RegisterDriver;
use crate::error::{IoFailure, IoSetupError, Result};
use crate::ports::{Bias, DigitalIo, Direction, LineId, PinState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    SerialData,
    Clock,
    ClockEnable,
    ParallelLoad,
}

/// Serial-data input plus clock, clock-enable and parallel-load outputs.
pub struct HalLines<SD, CLK, CE, PL> {
    serial_data: SD,
    clock: CLK,
    clock_enable: CE,
    parallel_load: PL,
    ids: [(LineId, Role); 4],
    claimed: [bool; 4],
    released: bool,
    warnings: bool,
}

impl<SD, CLK, CE, PL> HalLines<SD, CLK, CE, PL>
where
    SD: InputPin,
    CLK: OutputPin,
    CE: OutputPin,
    PL: OutputPin,
{
    pub fn new(config: &DriverConfig, serial_data: SD, clock: CLK, clock_enable: CE, parallel_load: PL) -> Self {
        Self {
            serial_data,
            clock,
            clock_enable,
            parallel_load,
            ids: [
                (config.serial_data, Role::SerialData),
                (config.clock, Role::Clock),
                (config.clock_enable, Role::ClockEnable),
                (config.parallel_load, Role::ParallelLoad),
            ],
            claimed: [false; 4],
            released: false,
            warnings: false,
        }
    }

    /// Hand the pins back; only meaningful once the driver is gone.
    pub fn into_pins(self) -> (SD, CLK, CE, PL) {
        (self.serial_data, self.clock, self.clock_enable, self.parallel_load)
    }

    fn slot(&self, id: LineId) -> Option<(usize, Role)> {
        self.ids
            .iter()
            .position(|&(line, _)| line == id)
            .map(|i| (i, self.ids[i].1))
    }

    fn claimed_role(&self, id: LineId) -> core::result::Result<Role, IoFailure> {
        if self.released {
            return Err(IoFailure::Released);
        }
        match self.slot(id) {
            Some((i, role)) if self.claimed[i] => Ok(role),
            _ => Err(IoFailure::Unclaimed(id)),
        }
    }
}

impl<SD, CLK, CE, PL> DigitalIo for HalLines<SD, CLK, CE, PL>
where
    SD: InputPin,
    CLK: OutputPin,
    CE: OutputPin,
    PL: OutputPin,
{
    fn configure_line(&mut self, id: LineId, direction: Direction, bias: Bias) -> core::result::Result<(), IoSetupError> {
        if self.released {
            return Err(IoSetupError::Released);
        }
        let (i, role) = self.slot(id).ok_or(IoSetupError::LineUnavailable(id))?;
        let expected = if role == Role::SerialData { Direction::Input } else { Direction::Output };
        if direction != expected {
            return Err(IoSetupError::DirectionUnsupported(id));
        }
        if self.claimed[i] && self.warnings {
            warn!("hal: line {id} already claimed");
        }
        if bias != Bias::None {
            debug!("hal: {bias:?} on line {id} is left to the HAL pin mode");
        }
        self.claimed[i] = true;
        Ok(())
    }

    fn write_line(&mut self, id: LineId, level: PinState) -> core::result::Result<(), IoFailure> {
        let result = match self.claimed_role(id)? {
            Role::SerialData => return Err(IoFailure::WriteFailed(id)),
            Role::Clock => self.clock.set_state(level).map_err(|e| e.kind()),
            Role::ClockEnable => self.clock_enable.set_state(level).map_err(|e| e.kind()),
            Role::ParallelLoad => self.parallel_load.set_state(level).map_err(|e| e.kind()),
        };
        result.map_err(|kind| {
            error!("hal: write to {id} failed: {kind:?}");
            IoFailure::WriteFailed(id)
        })
    }

    fn read_line(&mut self, id: LineId) -> core::result::Result<PinState, IoFailure> {
        if self.claimed_role(id)? != Role::SerialData {
            return Err(IoFailure::ReadFailed(id));
        }
        match self.serial_data.is_high() {
            Ok(high) => Ok(PinState::from(high)),
            Err(e) => {
                error!("hal: read of {id} failed: {:?}", e.kind());
                Err(IoFailure::ReadFailed(id))
            }
        }
    }

    fn release_all(&mut self) {
        if !self.released {
            debug!("hal: releasing lines");
        }
        self.claimed = [false; 4];
        self.released = true;
    }

    fn set_warnings(&mut self, enabled: bool) {
        self.warnings = enabled;
    }
}

impl<SD, CLK, CE, PL> RegisterDriver<HalLines<SD, CLK, CE, PL>>
where
    SD: InputPin,
    CLK: OutputPin,
    CE: OutputPin,
    PL: OutputPin,
{
    /// Build a driver straight from HAL pins.
    pub fn from_pins(config: DriverConfig, serial_data: SD, clock: CLK, clock_enable: CE, parallel_load: PL) -> Result<Self> {
        let lines = HalLines::new(&config, serial_data, clock, clock_enable, parallel_load);
        Self::new(lines, config)
    }
}
