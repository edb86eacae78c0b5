//! Hardware adapter: bridges the valve relays to the domain port trait.
//!
//! Owns one [`ValveDriver`] per configured valve and exposes them through
//! [`ValveActuatorPort`].  This is the only module in the system that
//! touches the relay outputs.  Watering blocks the caller for the whole
//! duration, in one-second delay steps.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{error, info, warn};

use crate::app::ports::ValveActuatorPort;
use crate::drivers::valve::ValveDriver;
use crate::error::ActuationError;

/// Concrete adapter that combines all valve relays behind the port trait.
pub struct ValveBank<P, D> {
    valves: Vec<(String, ValveDriver<P>)>,
    delay: D,
}

impl<P: OutputPin, D: DelayNs> ValveBank<P, D> {
    pub fn new(delay: D) -> Self {
        Self {
            valves: Vec::new(),
            delay,
        }
    }

    /// Register a driver under `valve_id`.
    pub fn add(&mut self, valve_id: impl Into<String>, driver: ValveDriver<P>) {
        self.valves.push((valve_id.into(), driver));
    }

    pub fn len(&self) -> usize {
        self.valves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valves.is_empty()
    }

    /// Drive every relay to closed.  Called at boot before the loop starts.
    pub fn close_all(&mut self) -> Result<(), ActuationError> {
        let mut first_err = None;
        for (id, driver) in &mut self.valves {
            if let Err(e) = driver.close() {
                error!("ValveBank: could not close '{}': {}", id, e);
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

// ── ValveActuatorPort implementation ──────────────────────────

impl<P: OutputPin, D: DelayNs> ValveActuatorPort for ValveBank<P, D> {
    fn actuate(&mut self, valve_id: &str, duration_secs: u32) -> Result<(), ActuationError> {
        let Some(driver) = self
            .valves
            .iter_mut()
            .find(|(id, _)| id == valve_id)
            .map(|(_, d)| d)
        else {
            return Err(ActuationError::UnknownValve(valve_id.to_string()));
        };

        if let Err(e) = driver.open() {
            // The relay may have latched anyway; leave it closed.
            if let Err(close_err) = driver.close() {
                warn!("ValveBank: '{}' close after failed open: {}", valve_id, close_err);
            }
            return Err(e);
        }
        info!("ValveBank: '{}' open (GPIO {}) for {}s", valve_id, driver.gpio(), duration_secs);

        for _ in 0..duration_secs {
            self.delay.delay_ms(1000);
        }

        if let Err(e) = driver.close() {
            warn!("ValveBank: '{}' close failed ({}), retrying", valve_id, e);
            if let Err(e) = driver.close() {
                error!("ValveBank: '{}' may still be open on GPIO {}: {}", valve_id, driver.gpio(), e);
                return Err(e);
            }
        }
        info!("ValveBank: '{}' closed", valve_id);
        Ok(())
    }
}
