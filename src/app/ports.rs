//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Driven adapters (valve relays, weather provider, event sinks, storage)
//! implement these traits.  The [`Controller`](super::controller::Controller)
//! consumes them via generics, so the domain core never touches GPIO, HTTP
//! or flash directly.

use chrono::NaiveDate;

use crate::config::IrrigationConfig;
use crate::error::{ActuationError, ConfigStoreError, Error, RecorderError, StorageError, WeatherError};
use crate::weather::{Forecast, WeatherSample};

use super::events::WateringEvent;

// ───────────────────────────────────────────────────────────────
// Valve actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to water a valve.
pub trait ValveActuatorPort {
    /// Open `valve_id`, keep it open for `duration_secs`, then close it.
    ///
    /// Blocks for the whole duration.
    fn actuate(&mut self, valve_id: &str, duration_secs: u32) -> Result<(), ActuationError>;
}

// ───────────────────────────────────────────────────────────────
// Weather port (driven adapter: provider → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: hourly precipitation and current conditions.
pub trait WeatherPort {
    /// Current conditions plus hourly samples for today and tomorrow.
    fn fetch_forecast(&mut self) -> Result<Forecast, WeatherError>;

    /// Hourly samples for a past calendar day, in chronological order.
    fn fetch_history(&mut self, date: NaiveDate) -> Result<Vec<WeatherSample>, WeatherError>;
}

/// Reports whether the network is reachable right now.
pub trait ConnectivityPort {
    fn is_online(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// HTTP transport port (driven adapter: domain → network)
// ───────────────────────────────────────────────────────────────

/// Blocking HTTP GET returning the response body.
///
/// Non-2xx responses map to [`WeatherError::Status`].
pub trait HttpPort {
    fn get(&mut self, url: &str) -> Result<Vec<u8>, WeatherError>;
}

// ───────────────────────────────────────────────────────────────
// Event recorder port (driven adapter: domain → logging / storage)
// ───────────────────────────────────────────────────────────────

/// Where watering events and failures end up (serial log, NVS ring, ...).
///
/// A recorder failure never aborts a tick; the controller logs it and moves
/// on.
pub trait EventRecorder {
    fn record_event(&mut self, event: &WateringEvent<'_>) -> Result<(), RecorderError>;

    fn record_error(&mut self, error: &Error) -> Result<(), RecorderError>;
}

/// Fan out to two recorders.  Both are always attempted; the first failure
/// is reported.
impl<A: EventRecorder, B: EventRecorder> EventRecorder for (A, B) {
    fn record_event(&mut self, event: &WateringEvent<'_>) -> Result<(), RecorderError> {
        let first = self.0.record_event(event);
        let second = self.1.record_event(event);
        first.and(second)
    }

    fn record_error(&mut self, error: &Error) -> Result<(), RecorderError> {
        let first = self.0.record_error(error);
        let second = self.1.record_error(error);
        first.and(second)
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the irrigation configuration.
///
/// Implementations MUST validate before persisting; an invalid configuration
/// is rejected with [`ConfigStoreError::Invalid`], never silently fixed up.
pub trait ConfigPort {
    /// Load the stored configuration, or `None` on a fresh device.
    fn load(&self) -> Result<Option<IrrigationConfig>, ConfigStoreError>;

    /// Validate and persist.
    fn save(&mut self, config: &IrrigationConfig) -> Result<(), ConfigStoreError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for the config blob and the event ring.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Write operations MUST be atomic; no partial writes on power loss.
///   The ESP-IDF NVS API guarantees this natively; in-memory simulation
///   achieves it trivially.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}
