//! Solenoid valve relay driver.
//!
//! One GPIO per valve drives a relay module input.  Many cheap relay boards
//! are active-low, so the driver maps open/close onto the configured level.
//!
//! ## Dual-target design
//!
//! Generic over [`embedded_hal::digital::OutputPin`]: on ESP-IDF this is an
//! `esp_idf_hal::gpio::PinDriver`; on host/test a mock pin that records
//! levels.

use embedded_hal::digital::OutputPin;

use crate::error::ActuationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveState {
    Closed,
    Open,
}

pub struct ValveDriver<P> {
    pin: P,
    gpio: i32,
    active_low: bool,
    state: ValveState,
}

impl<P: OutputPin> ValveDriver<P> {
    /// Wrap `pin`.  Does not touch the output; call [`close`](Self::close)
    /// to force a known state.
    pub fn new(pin: P, gpio: i32, active_low: bool) -> Self {
        Self {
            pin,
            gpio,
            active_low,
            state: ValveState::Closed,
        }
    }

    pub fn open(&mut self) -> Result<(), ActuationError> {
        self.drive(true)?;
        self.state = ValveState::Open;
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), ActuationError> {
        self.drive(false)?;
        self.state = ValveState::Closed;
        Ok(())
    }

    fn drive(&mut self, energise: bool) -> Result<(), ActuationError> {
        let high = energise != self.active_low;
        let result = if high { self.pin.set_high() } else { self.pin.set_low() };
        result.map_err(|e| ActuationError::PinWrite {
            pin: self.gpio,
            detail: format!("{e:?}"),
        })
    }

    pub fn state(&self) -> ValveState {
        self.state
    }

    pub fn gpio(&self) -> i32 {
        self.gpio
    }

    #[cfg(test)]
    pub(crate) fn pin(&self) -> &P {
        &self.pin
    }
}
