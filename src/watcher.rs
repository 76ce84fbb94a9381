//! Change watcher: turns a polled register into per-bit edge events.
//!
//! ```text
//!  RegisterDriver::read ──▶ diff(new, last) ──▶ went_high(pin)…  then  went_low(pin)…
//! ```
//!
//! ## Cycle
//!
//! 1. Read the chain.
//! 2. If the reading equals `last_reading`, nothing else happens.
//! 3. Otherwise diff, dispatch every rising pin (ascending), then every
//!    falling pin (ascending), and only then adopt the new reading.
//! 4. In [`run`](ChangeWatcher::run), check the stop flag.
//!
//! A handler that panics is caught at the dispatch boundary and reported
//! as [`Error::Handler`]; the remaining handlers for the cycle still run
//! and the loop keeps polling.  An I/O fault ends `run` with [`Error::Io`].
//!
//! There is no sleep between cycles; callers wanting a slower rate use
//! [`poll`](ChangeWatcher::poll) from their own loop.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, info};

use crate::adapters::log_handler::LogHandler;
use crate::bits::{BitSequence, PinIndex, TransitionSet, diff};
use crate::drivers::piso::RegisterDriver;
use crate::error::{Edge, Error, HandlerFault, Result};
use crate::ports::{DigitalIo, TransitionHandler};

// ───────────────────────────────────────────────────────────────
// Cancellation
// ───────────────────────────────────────────────────────────────

/// Cooperative stop flag for [`ChangeWatcher::run`].
///
/// Cloneable and `Send`, so it can be tripped from another thread, a
/// signal handler thread, or from inside a transition handler.  It is
/// only looked at between cycles: the in-flight read and dispatch
/// always finish.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Callback receiving caught handler faults.
pub type FaultReporter = Box<dyn FnMut(&Error) + Send>;

// ───────────────────────────────────────────────────────────────
// ChangeWatcher
// ───────────────────────────────────────────────────────────────

pub struct ChangeWatcher<IO: DigitalIo, H: TransitionHandler = LogHandler> {
    driver: RegisterDriver<IO>,
    handler: H,
    last_reading: BitSequence,
    stop: StopHandle,
    reporter: Option<FaultReporter>,
    fault_count: usize,
}

impl<IO: DigitalIo> ChangeWatcher<IO> {
    /// Watcher whose transitions are only logged.
    pub fn new(driver: RegisterDriver<IO>) -> Result<Self> {
        Self::with_handler(driver, LogHandler::new())
    }
}

impl<IO: DigitalIo, H: TransitionHandler> ChangeWatcher<IO, H> {
    /// Take a baseline reading right away so bits that are already high
    /// are not reported as having just gone high.
    pub fn with_handler(mut driver: RegisterDriver<IO>, handler: H) -> Result<Self> {
        let last_reading = driver.read()?;
        info!("watcher: baseline 0x{:x}", last_reading.to_bits());
        Ok(Self {
            driver,
            handler,
            last_reading,
            stop: StopHandle::default(),
            reporter: None,
            fault_count: 0,
        })
    }

    /// Send caught handler faults to `reporter` as well as the log.
    pub fn on_fault(mut self, reporter: impl FnMut(&Error) + Send + 'static) -> Self {
        self.reporter = Some(Box::new(reporter));
        self
    }

    /// Observe an existing cancellation token instead of a private one.
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// Read once and dispatch any change.  Returns whether anything changed.
    pub fn poll(&mut self) -> Result<bool> {
        let reading = self.driver.read()?;
        if reading == self.last_reading {
            return Ok(false);
        }

        let transitions = diff(&reading, &self.last_reading);
        debug!(
            "watcher: 0x{:x} -> 0x{:x} (up={:?} down={:?})",
            self.last_reading.to_bits(),
            reading.to_bits(),
            transitions.went_high(),
            transitions.went_low()
        );
        self.dispatch(&transitions);
        self.last_reading = reading;
        Ok(true)
    }

    /// Poll until a stop is requested or the hardware faults.
    pub fn run(&mut self) -> Result<()> {
        info!("watcher: polling started");
        loop {
            if let Err(e) = self.poll() {
                error!("watcher: stopping on {e}");
                return Err(e);
            }
            if self.stop.is_stop_requested() {
                info!("watcher: stop requested, polling ended");
                return Ok(());
            }
        }
    }

    /// Call the handler for every pin in `transitions`: all rising pins
    /// in ascending order, then all falling pins in ascending order.
    ///
    /// Returns how many handler calls failed.
    pub fn dispatch(&mut self, transitions: &TransitionSet) -> usize {
        let before = self.fault_count;
        for &pin in transitions.went_high() {
            self.invoke(pin, Edge::Rising);
        }
        for &pin in transitions.went_low() {
            self.invoke(pin, Edge::Falling);
        }
        self.fault_count - before
    }

    fn invoke(&mut self, pin: PinIndex, edge: Edge) {
        let handler = &mut self.handler;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| match edge {
            Edge::Rising => handler.went_high(pin),
            Edge::Falling => handler.went_low(pin),
        }));

        if let Err(payload) = outcome {
            let fault = HandlerFault::new(pin, edge, panic_message(&*payload));
            self.report(&Error::Handler(fault));
        }
    }

    fn report(&mut self, err: &Error) {
        self.fault_count += 1;
        error!("watcher: {err}");
        if let Some(reporter) = self.reporter.as_mut() {
            reporter(err);
        }
    }

    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    /// A handle that stops [`run`](Self::run) from elsewhere.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn last_reading(&self) -> &BitSequence {
        &self.last_reading
    }

    /// Handler faults caught since construction.
    pub fn fault_count(&self) -> usize {
        self.fault_count
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn driver(&self) -> &RegisterDriver<IO> {
        &self.driver
    }

    /// Stop watching and hand the driver back.
    pub fn into_driver(self) -> RegisterDriver<IO> {
        self.driver
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
