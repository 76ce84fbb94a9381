//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter       | Implements          | Connects to                   |
//! |---------------|---------------------|-------------------------------|
//! | `hal`         | DigitalIo           | embedded-hal 1.0 pins         |
//! | `sim`         | DigitalIo           | in-process 74HC165 model      |
//! | `log_handler` | TransitionHandler   | `log` facade                  |

pub mod hal;
pub mod log_handler;
pub mod sim;
