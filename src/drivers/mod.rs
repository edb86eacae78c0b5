//! Actuator drivers.

pub mod valve;
