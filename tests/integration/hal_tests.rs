//! Integration tests: HalLines adapter over embedded-hal mock pins.

use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, OutputPin};
use shiftreg165::adapters::hal::HalLines;
use shiftreg165::ports::{Bias, DigitalIo, Direction, LineId, PinState};
use shiftreg165::{DriverConfig, Error, IoFailure, IoSetupError, RegisterDriver};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<(&'static str, PinState)>>>;

struct OutPin {
    name: &'static str,
    log: Log,
}

impl ErrorType for OutPin {
    type Error = Infallible;
}

impl OutputPin for OutPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.log.borrow_mut().push((self.name, PinState::Low));
        Ok(())
    }
    fn set_high(&mut self) -> Result<(), Infallible> {
        self.log.borrow_mut().push((self.name, PinState::High));
        Ok(())
    }
}

struct InPin {
    levels: VecDeque<bool>,
}

impl ErrorType for InPin {
    type Error = Infallible;
}

impl InputPin for InPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.levels.pop_front().unwrap_or(false))
    }
    fn is_low(&mut self) -> Result<bool, Infallible> {
        self.is_high().map(|h| !h)
    }
}

#[derive(Debug)]
struct Broken;

impl digital::Error for Broken {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

struct BrokenPin;

impl ErrorType for BrokenPin {
    type Error = Broken;
}

impl OutputPin for BrokenPin {
    fn set_low(&mut self) -> Result<(), Broken> {
        Err(Broken)
    }
    fn set_high(&mut self) -> Result<(), Broken> {
        Err(Broken)
    }
}

const DATA: LineId = LineId(26);
const LOAD: LineId = LineId(4);
const CE: LineId = LineId(6);
const CLK: LineId = LineId(5);

fn config() -> DriverConfig {
    DriverConfig::new(DATA, LOAD, CE, CLK).with_bit_count(4)
}

fn outs(log: &Log) -> (OutPin, OutPin, OutPin) {
    let pin = |name| OutPin {
        name,
        log: Rc::clone(log),
    };
    (pin("clk"), pin("ce"), pin("pl"))
}

#[test]
fn driver_over_hal_pins_reads_and_drives_idle_levels() -> anyhow::Result<()> {
    let log: Log = Rc::default();
    let (clk, ce, pl) = outs(&log);
    let data = InPin {
        levels: [true, true, false, false].into(),
    };

    let mut driver = RegisterDriver::from_pins(config(), data, clk, ce, pl)?;
    assert_eq!(
        log.borrow()[..3],
        [("clk", PinState::Low), ("ce", PinState::Low), ("pl", PinState::High)]
    );

    let reading = driver.read()?;
    assert_eq!(reading.as_slice(), &[false, false, true, true]);
    assert_eq!(log.borrow()[3..5], [("pl", PinState::Low), ("pl", PinState::High)]);
    Ok(())
}

#[test]
fn unknown_line_and_wrong_direction_are_setup_errors() {
    let log: Log = Rc::default();
    let (clk, ce, pl) = outs(&log);
    let mut lines = HalLines::new(&config(), InPin { levels: VecDeque::new() }, clk, ce, pl);

    assert_eq!(
        lines.configure_line(LineId(99), Direction::Output, Bias::None),
        Err(IoSetupError::LineUnavailable(LineId(99)))
    );
    assert_eq!(
        lines.configure_line(CLK, Direction::Input, Bias::PullDown),
        Err(IoSetupError::DirectionUnsupported(CLK))
    );
    assert_eq!(lines.write_line(CLK, PinState::High), Err(IoFailure::Unclaimed(CLK)));
}

#[test]
fn release_makes_lines_unusable() {
    let log: Log = Rc::default();
    let (clk, ce, pl) = outs(&log);
    let mut lines = HalLines::new(&config(), InPin { levels: VecDeque::new() }, clk, ce, pl);
    lines.configure_line(DATA, Direction::Input, Bias::PullDown).unwrap();

    lines.release_all();
    lines.release_all();

    assert_eq!(lines.read_line(DATA), Err(IoFailure::Released));
    assert_eq!(
        lines.configure_line(DATA, Direction::Input, Bias::PullDown),
        Err(IoSetupError::Released)
    );
    let (_data, _clk, _ce, _pl) = lines.into_pins();
}

#[test]
fn hal_write_error_surfaces_as_io_failure() {
    let log: Log = Rc::default();
    let (_, ce, pl) = outs(&log);
    let data = InPin { levels: VecDeque::new() };

    let err = RegisterDriver::from_pins(config(), data, BrokenPin, ce, pl).err();
    assert_eq!(err, Some(Error::Io(IoFailure::WriteFailed(CLK))));
}
