//! Irrigation configuration.
//!
//! Loaded once at boot (from NVS, or the bundled `config/default.json` on a
//! fresh device), normalised, validated, then shared read-only by the control
//! loop.  Invalid configuration is fatal at startup.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::schedule::{Valve, WaterTimepoint};

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrigationConfig {
    pub valves: Vec<Valve>,
    /// Inherited by any valve that declares no timepoints of its own.
    #[serde(default)]
    pub default_timepoints: Vec<WaterTimepoint>,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub features: FeatureFlags,
    /// weatherapi.com condition codes that count as sunny.
    #[serde(default = "default_sunny_codes")]
    pub sunny_weather_codes: Vec<u16>,
    #[serde(default)]
    pub weather_api: WeatherApiConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    /// POSIX TZ rule for the device clock, e.g. `EST5EDT,M3.2.0,M11.1.0`.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Control loop poll interval (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u32,
}

/// Rain and heat thresholds used by the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    // --- Rain ---
    /// Rain (mm) in the lookback window that cancels watering
    pub past_rain_threshold_mm: f64,
    /// Forecast rain (mm) in the lookahead window that cancels watering
    pub future_rain_threshold_mm: f64,
    pub rain_lookback_hours: u32,
    pub rain_lookahead_hours: u32,

    // --- Heat ---
    /// Temperature (°F) strictly above which it counts as hot
    pub hot_threshold_f: f64,
    /// Relative humidity (%) strictly below which it counts as dry
    pub dry_threshold_pct: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            past_rain_threshold_mm: 12.0,
            future_rain_threshold_mm: 12.0,
            rain_lookback_hours: 6,
            rain_lookahead_hours: 6,
            hot_threshold_f: 80.0,
            dry_threshold_pct: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Consult the weather provider before watering.
    pub use_weather: bool,
    /// Secondary watering also requires low humidity and a sunny condition
    /// code, not just heat.
    pub secondary_requires_sunny_and_dry: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            use_weather: true,
            secondary_requires_sunny_and_dry: false,
        }
    }
}

/// weatherapi.com endpoint settings.
///
/// URL templates use `{key}`, `{location}` and (history only) `{date}`
/// placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherApiConfig {
    pub api_key: String,
    /// A US zip code, city name or "lat,lon".
    pub location: String,
    pub forecast_url: String,
    pub history_url: String,
}

impl Default for WeatherApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            location: String::new(),
            forecast_url: "http://api.weatherapi.com/v1/forecast.json?key={key}&q={location}&days=2&aqi=no&alerts=no".into(),
            history_url: "http://api.weatherapi.com/v1/history.json?key={key}&q={location}&dt={date}".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub ssid: String,
    pub password: String,
    /// Fetched to decide whether the device is online.
    pub check_online_url: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ssid: String::new(),
            password: String::new(),
            check_online_url: "http://clients3.google.com/generate_204".into(),
        }
    }
}

fn default_sunny_codes() -> Vec<u16> {
    // weatherapi.com "Sunny" / "Clear".
    vec![1000]
}

fn default_timezone() -> String {
    "UTC0".into()
}

fn default_poll_interval_ms() -> u32 {
    1000
}

const POLL_INTERVAL_RANGE_MS: core::ops::RangeInclusive<u32> = 100..=60_000;
const WINDOW_RANGE_HOURS: core::ops::RangeInclusive<u32> = 1..=24;

impl IrrigationConfig {
    /// Parse, normalise and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let mut config: Self =
            serde_json::from_str(json).map_err(|e| ConfigurationError::Parse(e.to_string()))?;
        config.normalise();
        config.validate()?;
        Ok(config)
    }

    /// Give every valve without timepoints a copy of the defaults.
    pub fn normalise(&mut self) {
        for valve in &mut self.valves {
            if valve.timepoints.is_empty() {
                valve.timepoints.clone_from(&self.default_timepoints);
            }
        }
    }

    /// Range and consistency checks.  Rejects rather than clamps.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.valves.is_empty() {
            return Err(ConfigurationError::NoValves);
        }

        for (i, valve) in self.valves.iter().enumerate() {
            for other in &self.valves[..i] {
                if other.id == valve.id {
                    return Err(ConfigurationError::DuplicateValveId(valve.id.clone()));
                }
                if other.pin == valve.pin {
                    return Err(ConfigurationError::DuplicatePin {
                        first: other.id.clone(),
                        second: valve.id.clone(),
                        pin: valve.pin,
                    });
                }
            }
            validate_timepoints(valve)?;
        }

        let t = &self.thresholds;
        if !t.past_rain_threshold_mm.is_finite() || t.past_rain_threshold_mm < 0.0 {
            return Err(ConfigurationError::InvalidThreshold("past_rain_threshold_mm"));
        }
        if !t.future_rain_threshold_mm.is_finite() || t.future_rain_threshold_mm < 0.0 {
            return Err(ConfigurationError::InvalidThreshold("future_rain_threshold_mm"));
        }
        if !t.hot_threshold_f.is_finite() {
            return Err(ConfigurationError::InvalidThreshold("hot_threshold_f"));
        }
        if t.dry_threshold_pct > 100 {
            return Err(ConfigurationError::InvalidThreshold("dry_threshold_pct"));
        }
        if !WINDOW_RANGE_HOURS.contains(&t.rain_lookback_hours) {
            return Err(ConfigurationError::InvalidThreshold("rain_lookback_hours"));
        }
        if !WINDOW_RANGE_HOURS.contains(&t.rain_lookahead_hours) {
            return Err(ConfigurationError::InvalidThreshold("rain_lookahead_hours"));
        }

        if !POLL_INTERVAL_RANGE_MS.contains(&self.poll_interval_ms) {
            return Err(ConfigurationError::PollInterval(self.poll_interval_ms));
        }

        if self.features.use_weather && self.weather_api.api_key.trim().is_empty() {
            return Err(ConfigurationError::MissingApiKey);
        }

        Ok(())
    }
}

fn validate_timepoints(valve: &Valve) -> Result<(), ConfigurationError> {
    for (i, tp) in valve.timepoints.iter().enumerate() {
        if tp.hour > 23 {
            return Err(ConfigurationError::HourOutOfRange {
                valve: valve.id.clone(),
                hour: tp.hour,
            });
        }
        if tp.minute > 59 {
            return Err(ConfigurationError::MinuteOutOfRange {
                valve: valve.id.clone(),
                minute: tp.minute,
            });
        }
        if tp.days.is_empty() {
            return Err(ConfigurationError::NoDays {
                valve: valve.id.clone(),
                hour: tp.hour,
                minute: tp.minute,
            });
        }
        if tp.duration_secs == 0 {
            return Err(ConfigurationError::ZeroDuration {
                valve: valve.id.clone(),
                hour: tp.hour,
                minute: tp.minute,
            });
        }
        let clash = valve.timepoints[..i].iter().any(|earlier| {
            earlier.kind == tp.kind
                && earlier.hour == tp.hour
                && earlier.minute == tp.minute
                && earlier.days.overlaps(tp.days)
        });
        if clash {
            return Err(ConfigurationError::DuplicateTimepoint {
                valve: valve.id.clone(),
                kind: tp.kind,
                hour: tp.hour,
                minute: tp.minute,
            });
        }
    }
    Ok(())
}
