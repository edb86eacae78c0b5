//! Weather data model and the per-tick snapshot pipeline.
//!
//! ```text
//!   WeatherPort::fetch_forecast ──┐
//!   WeatherPort::fetch_history ───┼──▶ merge_timeline ──▶ aggregate ──▶ WeatherSnapshot
//!        (each day the lookback   │
//!         reaches before today) ──┘
//! ```

pub mod api;
pub mod timeline;

use chrono::{DateTime, TimeZone, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::app::ports::WeatherPort;
use crate::config::Thresholds;
use crate::error::WeatherError;
use timeline::{aggregate, history_days, merge_timeline};

/// One hourly precipitation observation or forecast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherSample {
    pub timestamp: DateTime<Utc>,
    /// Always >= 0.
    pub precipitation_mm: f64,
}

/// Conditions reported for "now" by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_f: f64,
    pub humidity_pct: u8,
    pub condition_code: u16,
    pub condition_text: String,
}

/// Current conditions plus chronological hourly samples for today and
/// tomorrow.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub current: CurrentConditions,
    pub samples: Vec<WeatherSample>,
}

/// Everything the decision engine needs from the weather, built once per
/// tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub current: CurrentConditions,
    pub past_precipitation_mm: f64,
    pub future_precipitation_mm: f64,
}

/// Weather outcome for a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherStatus {
    Available(WeatherSnapshot),
    /// Weather is enabled but could not be obtained.
    Unavailable(WeatherError),
    /// Weather is switched off in the configuration.
    Disabled,
}

impl WeatherStatus {
    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        match self {
            Self::Available(s) => Some(s),
            Self::Unavailable(_) | Self::Disabled => None,
        }
    }
}

/// Fetch the forecast (and each history day the lookback needs, oldest
/// first) and reduce it to a [`WeatherSnapshot`] around `reference`.
/// No retries.
pub fn collect_snapshot<W, Tz>(
    provider: &mut W,
    reference: &DateTime<Tz>,
    thresholds: &Thresholds,
) -> Result<WeatherSnapshot, WeatherError>
where
    W: WeatherPort + ?Sized,
    Tz: TimeZone,
{
    let forecast = provider.fetch_forecast()?;
    let mut history = Vec::new();
    for day in history_days(reference, thresholds.rain_lookback_hours) {
        debug!("Weather: lookback reaches {day}, fetching history");
        history.extend(provider.fetch_history(day)?);
    }

    let samples = merge_timeline(history, forecast.samples)?;
    let totals = aggregate(
        &samples,
        reference,
        thresholds.rain_lookback_hours,
        thresholds.rain_lookahead_hours,
    );

    Ok(WeatherSnapshot {
        current: forecast.current,
        past_precipitation_mm: totals.past_mm,
        future_precipitation_mm: totals.future_mm,
    })
}
