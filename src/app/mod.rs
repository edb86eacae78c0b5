//! Application core: pure domain logic, zero I/O.
//!
//! The [`controller`] ties the schedule matcher, weather timeline and
//! decision engine together.  All interaction with valves, the network and
//! storage happens through **port traits** defined in [`ports`], keeping this
//! layer fully testable without real peripherals.

pub mod controller;
pub mod events;
pub mod ports;
