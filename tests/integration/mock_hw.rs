//! Mock adapters for integration tests.
//!
//! Records every port call so tests can assert on the full history without
//! touching GPIO or the network.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use irrigator::app::events::WateringEvent;
use irrigator::app::ports::{ConnectivityPort, EventRecorder, ValveActuatorPort, WeatherPort};
use irrigator::error::{ActuationError, Error, RecorderError, StorageError, WeatherError};
use irrigator::schedule::TimepointKind;
use irrigator::weather::{CurrentConditions, Forecast, WeatherSample};

// ── Network ───────────────────────────────────────────────────

/// Scripted weather provider plus connectivity probe.
pub struct MockNet {
    pub online: bool,
    pub current: CurrentConditions,
    pub forecast: Vec<WeatherSample>,
    pub history: Vec<WeatherSample>,
    pub forecast_error: Option<WeatherError>,
    pub online_checks: u32,
    pub forecast_calls: u32,
    pub history_requests: Vec<NaiveDate>,
}

#[allow(dead_code)]
impl MockNet {
    /// Online, 85 F, 30 %, sunny, no rain anywhere.
    pub fn sunny() -> Self {
        Self {
            online: true,
            current: conditions(85.0, 30, 1000),
            forecast: Vec::new(),
            history: Vec::new(),
            forecast_error: None,
            online_checks: 0,
            forecast_calls: 0,
            history_requests: Vec::new(),
        }
    }

    pub fn with_current(mut self, temperature_f: f64, humidity_pct: u8, code: u16) -> Self {
        self.current = conditions(temperature_f, humidity_pct, code);
        self
    }

    pub fn offline() -> Self {
        Self {
            online: false,
            ..Self::sunny()
        }
    }
}

impl ConnectivityPort for MockNet {
    fn is_online(&mut self) -> bool {
        self.online_checks += 1;
        self.online
    }
}

impl WeatherPort for MockNet {
    fn fetch_forecast(&mut self) -> Result<Forecast, WeatherError> {
        self.forecast_calls += 1;
        if let Some(e) = &self.forecast_error {
            return Err(e.clone());
        }
        Ok(Forecast {
            current: self.current.clone(),
            samples: self.forecast.clone(),
        })
    }

    fn fetch_history(&mut self, date: NaiveDate) -> Result<Vec<WeatherSample>, WeatherError> {
        self.history_requests.push(date);
        Ok(self.history.clone())
    }
}

pub fn conditions(temperature_f: f64, humidity_pct: u8, code: u16) -> CurrentConditions {
    CurrentConditions {
        temperature_f,
        humidity_pct,
        condition_code: code,
        condition_text: if code == 1000 { "Sunny".into() } else { "Cloudy".into() },
    }
}

/// `hours` hourly samples of `mm` each, starting at `start`.
pub fn hourly(start: DateTime<Utc>, hours: i64, mm: f64) -> Vec<WeatherSample> {
    (0..hours)
        .map(|h| WeatherSample {
            timestamp: start + TimeDelta::hours(h),
            precipitation_mm: mm,
        })
        .collect()
}

// ── Valves ────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockValves {
    /// (valve_id, duration_secs) per successful actuation, in order.
    pub opened: Vec<(String, u32)>,
    /// Valves whose relay is broken.
    pub failing: Vec<&'static str>,
}

impl ValveActuatorPort for MockValves {
    fn actuate(&mut self, valve_id: &str, duration_secs: u32) -> Result<(), ActuationError> {
        if self.failing.iter().any(|f| *f == valve_id) {
            return Err(ActuationError::PinWrite {
                pin: -1,
                detail: "relay stuck".into(),
            });
        }
        self.opened.push((valve_id.to_string(), duration_secs));
        Ok(())
    }
}

// ── Recorder ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub valve_id: String,
    pub kind: TimepointKind,
    pub had_weather: bool,
}

#[derive(Default)]
pub struct MockRecorder {
    pub events: Vec<RecordedEvent>,
    pub errors: Vec<Error>,
    /// Every call fails after being captured.
    pub broken: bool,
}

impl EventRecorder for MockRecorder {
    fn record_event(&mut self, event: &WateringEvent<'_>) -> Result<(), RecorderError> {
        self.events.push(RecordedEvent {
            valve_id: event.valve_id.to_string(),
            kind: event.kind,
            had_weather: event.weather.is_some(),
        });
        if self.broken {
            return Err(RecorderError::Storage(StorageError::IoError));
        }
        Ok(())
    }

    fn record_error(&mut self, error: &Error) -> Result<(), RecorderError> {
        self.errors.push(error.clone());
        if self.broken {
            return Err(RecorderError::Storage(StorageError::IoError));
        }
        Ok(())
    }
}
