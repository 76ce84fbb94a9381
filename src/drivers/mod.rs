//! Register drivers.

pub mod piso;
