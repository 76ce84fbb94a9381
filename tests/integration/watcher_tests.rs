//! Integration tests: ChangeWatcher over the simulated chain.

use crate::mock_hw::ScriptedIo;
use shiftreg165::adapters::sim::{SimHandle, SimulatedChain};
use shiftreg165::ports::{FnHandler, LineId, TransitionHandler};
use shiftreg165::{BitSequence, ChangeWatcher, DriverConfig, Error, IoFailure, PinIndex, RegisterDriver, StopHandle};
use std::sync::{Arc, Mutex};
use std::thread;

fn config() -> DriverConfig {
    DriverConfig::new(LineId(26), LineId(4), LineId(6), LineId(5))
}

#[derive(Default)]
struct Calls {
    high: Vec<PinIndex>,
    low: Vec<PinIndex>,
}

impl TransitionHandler for Calls {
    fn went_high(&mut self, pin: PinIndex) {
        self.high.push(pin);
    }
    fn went_low(&mut self, pin: PinIndex) {
        self.low.push(pin);
    }
}

fn watching(inputs: u64) -> anyhow::Result<(ChangeWatcher<SimulatedChain, Calls>, SimHandle)> {
    let sim = SimulatedChain::new(&config());
    let handle = sim.handle();
    handle.set_inputs(inputs);
    let driver = RegisterDriver::new(sim, config())?;
    Ok((ChangeWatcher::with_handler(driver, Calls::default())?, handle))
}

fn pattern(bits: [u8; 8]) -> u64 {
    bits.iter()
        .enumerate()
        .fold(0, |acc, (i, &b)| acc | (u64::from(b) << i))
}

#[test]
fn two_pins_rise_in_one_cycle() -> anyhow::Result<()> {
    let t0 = pattern([1, 0, 1, 0, 0, 0, 0, 0]);
    let t1 = pattern([1, 0, 1, 1, 0, 0, 1, 0]);
    let (mut w, handle) = watching(t0)?;
    assert_eq!(w.last_reading(), &BitSequence::from_bits(t0, 8));

    handle.set_inputs(t1);
    w.request_stop();
    w.run()?;

    assert_eq!(w.handler().high, vec![3, 6]);
    assert!(w.handler().low.is_empty());
    assert_eq!(w.last_reading(), &BitSequence::from_bits(t1, 8));
    Ok(())
}

#[test]
fn unchanged_reading_dispatches_nothing() -> anyhow::Result<()> {
    let (mut w, _handle) = watching(pattern([1, 0, 1, 1, 0, 0, 0, 0]))?;
    let before = w.last_reading().clone();

    assert!(!w.poll()?);
    assert!(!w.poll()?);

    assert!(w.handler().high.is_empty());
    assert!(w.handler().low.is_empty());
    assert_eq!(w.last_reading(), &before);
    Ok(())
}

#[test]
fn dispatch_order_is_all_highs_then_all_lows() -> anyhow::Result<()> {
    let order = Arc::new(Mutex::new(Vec::new()));
    let (hi, lo) = (Arc::clone(&order), Arc::clone(&order));
    let handler = FnHandler::new(
        move |pin| hi.lock().unwrap().push(format!("high:{pin}")),
        move |pin| lo.lock().unwrap().push(format!("low:{pin}")),
    );

    let sim = SimulatedChain::new(&config());
    let handle = sim.handle();
    handle.set_inputs(pattern([0, 1, 0, 1, 0, 0, 0, 0]));
    let mut w = ChangeWatcher::with_handler(RegisterDriver::new(sim, config())?, handler)?;

    handle.set_inputs(pattern([0, 0, 1, 0, 0, 1, 0, 0]));
    assert!(w.poll()?);

    assert_eq!(*order.lock().unwrap(), vec!["high:2", "high:5", "low:1", "low:3"]);
    Ok(())
}

#[test]
fn handler_can_stop_its_own_loop() -> anyhow::Result<()> {
    let sim = SimulatedChain::new(&config());
    let handle = sim.handle();
    let driver = RegisterDriver::new(sim, config())?;

    let stop = StopHandle::default();
    let stopper = stop.clone();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in = Arc::clone(&seen);
    let handler = FnHandler::new(
        move |pin| {
            seen_in.lock().unwrap().push(pin);
            stopper.request_stop();
        },
        |_| {},
    );
    let mut w = ChangeWatcher::with_handler(driver, handler)?.with_stop_handle(stop.clone());

    handle.set_input(4, true);
    w.run()?;
    assert!(stop.is_stop_requested());
    assert_eq!(*seen.lock().unwrap(), vec![4]);
    Ok(())
}

#[test]
fn stop_from_another_thread_ends_run() -> anyhow::Result<()> {
    let (mut w, handle) = watching(0)?;
    let stopper = w.stop_handle();

    let poller = thread::spawn(move || {
        let result = w.run();
        (result, w.handler().high.clone())
    });

    handle.set_input(7, true);
    // Give the loop a chance to observe the change before stopping it.
    thread::sleep(std::time::Duration::from_millis(20));
    stopper.request_stop();

    let (result, high) = poller.join().expect("poller thread panicked");
    result?;
    assert_eq!(high, vec![7]);
    Ok(())
}

#[test]
fn panicking_handler_does_not_end_run() -> anyhow::Result<()> {
    let sim = SimulatedChain::new(&config());
    let handle = sim.handle();
    let driver = RegisterDriver::new(sim, config())?;

    let faults = Arc::new(Mutex::new(Vec::new()));
    let faults_in = Arc::clone(&faults);
    let mut w = ChangeWatcher::with_handler(
        driver,
        FnHandler::new(|pin| assert_ne!(pin, 0, "pin 0 handler rejects"), |_| {}),
    )?
    .on_fault(move |e| faults_in.lock().unwrap().push(e.clone()));

    handle.set_inputs(0b11);
    assert!(w.poll()?);
    handle.set_inputs(0b00);
    assert!(w.poll()?);

    let faults = faults.lock().unwrap();
    assert_eq!(faults.len(), 1);
    assert!(matches!(&faults[0], Error::Handler(f) if f.pin == 0));
    assert_eq!(w.last_reading().to_bits(), 0);
    Ok(())
}

#[test]
fn read_fault_mid_poll_ends_run_without_dispatch() -> anyhow::Result<()> {
    // Baseline samples all low, the next reading would be all high, but
    // the fourth sample of that second read faults.
    let io = ScriptedIo::new()
        .with_script([false; 8].into_iter().chain([true; 8]))
        .failing_read_at(8 + 3);
    let state = io.shared();
    let mut w = ChangeWatcher::with_handler(RegisterDriver::new(io, config())?, Calls::default())?;
    let baseline = BitSequence::from_bits(0, 8);
    assert_eq!(w.last_reading(), &baseline);

    let err = w.run().err();

    assert_eq!(err, Some(Error::Io(IoFailure::ReadFailed(LineId(26)))));
    assert!(w.handler().high.is_empty());
    assert!(w.handler().low.is_empty());
    assert_eq!(w.last_reading(), &baseline);
    assert_eq!(state.borrow().reads, 8 + 4);
    Ok(())
}

#[test]
fn watcher_hands_back_a_live_driver() -> anyhow::Result<()> {
    let (w, handle) = watching(0b1010)?;
    let mut driver = w.into_driver();
    handle.set_inputs(0b0101);
    assert_eq!(driver.read()?.to_bits(), 0b0101);
    driver.release();
    assert_eq!(handle.release_count(), 1);
    Ok(())
}
