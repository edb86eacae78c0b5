//! Watering decision engine.
//!
//! | Kind      | No weather | Rain breach | Otherwise                         |
//! |-----------|------------|-------------|-----------------------------------|
//! | Primary   | water      | skip        | water                             |
//! | Secondary | skip       | skip        | water iff hot (and dry and sunny) |
//!
//! A rain breach is `past >= past_threshold` or `future >= future_threshold`.
//! Pure functions only; the caller does the logging and recording.

use crate::config::{IrrigationConfig, Thresholds};
use crate::schedule::TimepointKind;
use crate::weather::{WeatherSnapshot, WeatherStatus};

/// What counts as "hot enough" for a secondary watering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryPolicy {
    /// Temperature above the hot threshold.
    HotOnly,
    /// Hot, humidity below the dry threshold, and a sunny condition code.
    HotDrySunny,
}

/// Immutable view of the configuration the engine needs.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRules {
    pub past_rain_threshold_mm: f64,
    pub future_rain_threshold_mm: f64,
    pub hot_threshold_f: f64,
    pub dry_threshold_pct: u8,
    pub sunny_codes: Vec<u16>,
    pub secondary: SecondaryPolicy,
}

impl DecisionRules {
    pub fn from_config(config: &IrrigationConfig) -> Self {
        let secondary = if config.features.secondary_requires_sunny_and_dry {
            SecondaryPolicy::HotDrySunny
        } else {
            SecondaryPolicy::HotOnly
        };
        Self::new(&config.thresholds, config.sunny_weather_codes.clone(), secondary)
    }

    pub fn new(thresholds: &Thresholds, sunny_codes: Vec<u16>, secondary: SecondaryPolicy) -> Self {
        Self {
            past_rain_threshold_mm: thresholds.past_rain_threshold_mm,
            future_rain_threshold_mm: thresholds.future_rain_threshold_mm,
            hot_threshold_f: thresholds.hot_threshold_f,
            dry_threshold_pct: thresholds.dry_threshold_pct,
            sunny_codes,
            secondary,
        }
    }
}

/// Why a decision went the way it did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reason {
    /// Primary slot with no rain breach.
    Scheduled,
    /// No weather data (disabled or unavailable); the kind's default applies.
    NoWeather,
    RainedRecently { past_mm: f64 },
    RainForecast { future_mm: f64 },
    /// Secondary slot whose heat condition holds.
    HotAndDry,
    NotHot { temperature_f: f64 },
    TooHumid { humidity_pct: u8 },
    NotSunny { condition_code: u16 },
}

impl core::fmt::Display for Reason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Scheduled => write!(f, "scheduled"),
            Self::NoWeather => write!(f, "no weather data"),
            Self::RainedRecently { past_mm } => write!(f, "rained {past_mm:.1} mm recently"),
            Self::RainForecast { future_mm } => write!(f, "{future_mm:.1} mm rain forecast"),
            Self::HotAndDry => write!(f, "hot and dry"),
            Self::NotHot { temperature_f } => write!(f, "not hot ({temperature_f:.1} F)"),
            Self::TooHumid { humidity_pct } => write!(f, "too humid ({humidity_pct}%)"),
            Self::NotSunny { condition_code } => write!(f, "not sunny (code {condition_code})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub water: bool,
    pub reason: Reason,
}

impl Decision {
    const fn water(reason: Reason) -> Self {
        Self { water: true, reason }
    }

    const fn skip(reason: Reason) -> Self {
        Self { water: false, reason }
    }
}

/// Decide whether a timepoint of `kind` should water under `weather`.
pub fn decide(kind: TimepointKind, weather: &WeatherStatus, rules: &DecisionRules) -> Decision {
    match kind {
        TimepointKind::Primary => decide_primary(weather, rules),
        TimepointKind::Secondary => decide_secondary(weather, rules),
    }
}

fn decide_primary(weather: &WeatherStatus, rules: &DecisionRules) -> Decision {
    match weather {
        WeatherStatus::Available(snapshot) => match rain_breach(snapshot, rules) {
            Some(reason) => Decision::skip(reason),
            None => Decision::water(Reason::Scheduled),
        },
        WeatherStatus::Unavailable(_) | WeatherStatus::Disabled => Decision::water(Reason::NoWeather),
    }
}

fn decide_secondary(weather: &WeatherStatus, rules: &DecisionRules) -> Decision {
    let snapshot = match weather {
        WeatherStatus::Available(snapshot) => snapshot,
        WeatherStatus::Unavailable(_) | WeatherStatus::Disabled => {
            return Decision::skip(Reason::NoWeather);
        }
    };
    if let Some(reason) = rain_breach(snapshot, rules) {
        return Decision::skip(reason);
    }

    let current = &snapshot.current;
    if current.temperature_f <= rules.hot_threshold_f {
        return Decision::skip(Reason::NotHot {
            temperature_f: current.temperature_f,
        });
    }
    if rules.secondary == SecondaryPolicy::HotDrySunny {
        if current.humidity_pct >= rules.dry_threshold_pct {
            return Decision::skip(Reason::TooHumid {
                humidity_pct: current.humidity_pct,
            });
        }
        if !rules.sunny_codes.contains(&current.condition_code) {
            return Decision::skip(Reason::NotSunny {
                condition_code: current.condition_code,
            });
        }
    }
    Decision::water(Reason::HotAndDry)
}

fn rain_breach(snapshot: &WeatherSnapshot, rules: &DecisionRules) -> Option<Reason> {
    if snapshot.past_precipitation_mm >= rules.past_rain_threshold_mm {
        Some(Reason::RainedRecently {
            past_mm: snapshot.past_precipitation_mm,
        })
    } else if snapshot.future_precipitation_mm >= rules.future_rain_threshold_mm {
        Some(Reason::RainForecast {
            future_mm: snapshot.future_precipitation_mm,
        })
    } else {
        None
    }
}
