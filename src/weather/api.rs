//! weatherapi.com response parsing.
//!
//! Forecast and history responses share one shape; history simply has no
//! `current` block:
//!
//! ```json
//! {
//!   "current":  { "temp_f": 81.0, "humidity": 30,
//!                 "condition": { "text": "Sunny", "code": 1000 } },
//!   "forecast": { "forecastday": [
//!                   { "hour": [ { "time": "2024-05-31 03:00", "precip_mm": 1.2 } ] } ] }
//! }
//! ```
//!
//! Hour stamps are wall-clock times at the queried location.  They are
//! resolved in the supplied time zone; a stamp that falls in a DST gap is
//! skipped, an ambiguous one takes the earlier instant.

use chrono::{NaiveDateTime, TimeZone, Utc};
use log::debug;
use serde::Deserialize;

use super::{CurrentConditions, Forecast, WeatherSample};
use crate::error::WeatherError;

const HOUR_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Deserialize)]
struct Response {
    current: Option<Current>,
    forecast: ForecastSection,
}

#[derive(Debug, Deserialize)]
struct Current {
    temp_f: f64,
    humidity: u8,
    condition: Condition,
}

#[derive(Debug, Deserialize)]
struct Condition {
    text: String,
    code: u16,
}

#[derive(Debug, Deserialize)]
struct ForecastSection {
    #[serde(alias = "forecastDay")]
    forecastday: Vec<Day>,
}

#[derive(Debug, Deserialize)]
struct Day {
    hour: Vec<Hour>,
}

#[derive(Debug, Deserialize)]
struct Hour {
    time: String,
    precip_mm: f64,
}

fn decode(body: &[u8]) -> Result<Response, WeatherError> {
    serde_json::from_slice(body).map_err(|e| WeatherError::Parse(e.to_string()))
}

fn samples<Tz: TimeZone>(section: ForecastSection, tz: &Tz) -> Result<Vec<WeatherSample>, WeatherError> {
    let mut out = Vec::new();
    for hour in section.forecastday.into_iter().flat_map(|d| d.hour) {
        if !hour.precip_mm.is_finite() || hour.precip_mm < 0.0 {
            return Err(WeatherError::Parse(format!(
                "invalid precipitation {} at {}",
                hour.precip_mm, hour.time
            )));
        }
        let naive = NaiveDateTime::parse_from_str(&hour.time, HOUR_FORMAT)
            .map_err(|e| WeatherError::Parse(format!("bad hour stamp '{}': {e}", hour.time)))?;
        let Some(local) = tz.from_local_datetime(&naive).earliest() else {
            debug!("Weather: skipping non-existent local time {}", hour.time);
            continue;
        };
        out.push(WeatherSample {
            timestamp: local.with_timezone(&Utc),
            precipitation_mm: hour.precip_mm,
        });
    }
    Ok(out)
}

/// Parse a forecast response.  Requires the `current` block.
pub fn parse_forecast<Tz: TimeZone>(body: &[u8], tz: &Tz) -> Result<Forecast, WeatherError> {
    let response = decode(body)?;
    let current = response
        .current
        .ok_or_else(|| WeatherError::Parse("forecast has no current conditions".into()))?;
    Ok(Forecast {
        current: CurrentConditions {
            temperature_f: current.temp_f,
            humidity_pct: current.humidity,
            condition_code: current.condition.code,
            condition_text: current.condition.text,
        },
        samples: samples(response.forecast, tz)?,
    })
}

/// Parse a history response into hourly samples.
pub fn parse_history<Tz: TimeZone>(body: &[u8], tz: &Tz) -> Result<Vec<WeatherSample>, WeatherError> {
    samples(decode(body)?.forecast, tz)
}
