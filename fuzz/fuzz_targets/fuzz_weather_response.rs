//! Fuzz target: weatherapi.com response parsing
//!
//! Feeds arbitrary bytes to the forecast and history parsers and checks:
//! - No panics on malformed JSON, bad hour stamps or odd numbers
//! - Every accepted sample has finite, non-negative precipitation
//! - Aggregating whatever was accepted never panics
//!
//! cargo fuzz run fuzz_weather_response

#![no_main]

use chrono::{FixedOffset, Utc};
use libfuzzer_sys::fuzz_target;
use irrigator::weather::api::{parse_forecast, parse_history};
use irrigator::weather::timeline::aggregate;

fuzz_target!(|data: &[u8]| {
    let tz = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();

    if let Ok(forecast) = parse_forecast(data, &tz) {
        for s in &forecast.samples {
            assert!(s.precipitation_mm.is_finite() && s.precipitation_mm >= 0.0);
        }
        if let Some(first) = forecast.samples.first() {
            let totals = aggregate(&forecast.samples, &first.timestamp, 24, 24);
            assert!(totals.past_mm >= 0.0 && totals.future_mm >= 0.0);
        }
    }

    if let Ok(history) = parse_history(data, &Utc) {
        for s in &history {
            assert!(s.precipitation_mm.is_finite() && s.precipitation_mm >= 0.0);
        }
    }
});
