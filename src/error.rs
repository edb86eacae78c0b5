//! Unified error types for the irrigation controller.
//!
//! A single [`Error`] enum that every subsystem can convert into, keeping the
//! control loop's error handling uniform.  Three top-level categories exist:
//!
//! | Variant              | Raised by                 | Handling                          |
//! |----------------------|---------------------------|-----------------------------------|
//! | `WeatherUnavailable` | weather fetch / parse     | no-weather decision policy        |
//! | `ActuationFailure`   | valve actuator            | valve skipped for this tick       |
//! | `Configuration`      | config load / validation  | fatal at startup                  |

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

/// Every failure the control loop can record funnels into this type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Weather data could not be fetched or parsed for this tick.
    #[error("weather unavailable: {0}")]
    WeatherUnavailable(#[from] WeatherError),

    /// The actuator reported an error while driving a valve.
    #[error("actuation failed on valve '{valve_id}': {source}")]
    ActuationFailure {
        valve_id: String,
        #[source]
        source: ActuationError,
    },

    /// The schedule or thresholds are malformed.
    #[error("configuration: {0}")]
    Configuration(#[from] ConfigurationError),
}

// ---------------------------------------------------------------------------
// Weather errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    /// The connectivity probe reported no network.
    #[error("device offline")]
    Offline,
    /// The HTTP request could not be completed.
    #[error("transport: {0}")]
    Transport(String),
    /// The provider answered with a non-success status.
    #[error("provider returned HTTP {0}")]
    Status(u16),
    /// The response body did not match the expected schema.
    #[error("parse: {0}")]
    Parse(String),
    /// A sample source was not in chronological order.
    #[error("{0} samples are not chronological")]
    Unordered(&'static str),
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActuationError {
    /// No driver is registered for the requested valve id.
    #[error("no valve with id '{0}'")]
    UnknownValve(String),
    /// Driving the relay pin high/low failed.
    #[error("GPIO {pin} write failed: {detail}")]
    PinWrite { pin: i32, detail: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("could not parse configuration: {0}")]
    Parse(String),
    #[error("at least one valve must be configured")]
    NoValves,
    #[error("duplicate valve id '{0}'")]
    DuplicateValveId(String),
    #[error("valves '{first}' and '{second}' share pin {pin}")]
    DuplicatePin {
        first: String,
        second: String,
        pin: i32,
    },
    #[error("valve '{valve}': hour {hour} out of range 0-23")]
    HourOutOfRange { valve: String, hour: u8 },
    #[error("valve '{valve}': minute {minute} out of range 0-59")]
    MinuteOutOfRange { valve: String, minute: u8 },
    #[error("valve '{valve}': timepoint {hour:02}:{minute:02} has no days")]
    NoDays { valve: String, hour: u8, minute: u8 },
    #[error("valve '{valve}': timepoint {hour:02}:{minute:02} has zero duration")]
    ZeroDuration { valve: String, hour: u8, minute: u8 },
    #[error("valve '{valve}': duplicate {kind} timepoint at {hour:02}:{minute:02}")]
    DuplicateTimepoint {
        valve: String,
        kind: crate::schedule::TimepointKind,
        hour: u8,
        minute: u8,
    },
    #[error("invalid threshold: {0}")]
    InvalidThreshold(&'static str),
    #[error("poll interval {0} ms out of range 100-60000")]
    PollInterval(u32),
    #[error("weather enabled but no API key configured")]
    MissingApiKey,
}

// ---------------------------------------------------------------------------
// Storage / persistence errors
// ---------------------------------------------------------------------------

/// Errors from [`StoragePort`](crate::app::ports::StoragePort) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Requested key does not exist.
    #[error("key not found")]
    NotFound,
    /// Storage partition is full.
    #[error("storage full")]
    Full,
    /// Generic I/O error.
    #[error("I/O error")]
    IoError,
}

/// Errors from [`ConfigPort`](crate::app::ports::ConfigPort) operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigStoreError {
    /// Stored config failed deserialization.
    #[error("stored config corrupted")]
    Corrupted,
    /// The config failed validation and was not persisted.
    #[error(transparent)]
    Invalid(#[from] ConfigurationError),
    /// Underlying storage failed.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from [`EventRecorder`](crate::app::ports::EventRecorder) sinks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecorderError {
    #[error("could not encode record")]
    Encode,
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
}
