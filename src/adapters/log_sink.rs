//! Log-based event recorder adapter.
//!
//! Implements [`EventRecorder`] by writing watering events and failures to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{error, info};

use crate::app::events::WateringEvent;
use crate::app::ports::EventRecorder;
use crate::error::{Error, RecorderError};

/// One-line description of a watering event.
///
/// With weather: `Valve: front (Front lawn) || Temp: 81.0 || Humidity: 30 ||
/// Condition: Sunny || Water Type: primary`.  Without weather the short
/// form `Water on Valve front (Front lawn) Event: primary` is used.
pub fn format_event_message(event: &WateringEvent<'_>) -> String {
    match event.weather {
        Some(w) => format!(
            "Valve: {} ({}) || Temp: {:.1} || Humidity: {} || Condition: {} || Water Type: {}",
            event.valve_id,
            event.valve_name,
            w.current.temperature_f,
            w.current.humidity_pct,
            w.current.condition_text,
            event.kind
        ),
        None => format!(
            "Water on Valve {} ({}) Event: {}",
            event.valve_id, event.valve_name, event.kind
        ),
    }
}

/// Adapter that logs every event and error to the serial console.
pub struct LogRecorder;

impl LogRecorder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRecorder for LogRecorder {
    fn record_event(&mut self, event: &WateringEvent<'_>) -> Result<(), RecorderError> {
        info!(
            "EVENT | {} | {}s | {}",
            event.at.format("%Y-%m-%d %H:%M"),
            event.duration_secs,
            format_event_message(event)
        );
        Ok(())
    }

    fn record_error(&mut self, err: &Error) -> Result<(), RecorderError> {
        error!("ERROR | {}", err);
        Ok(())
    }
}
