//! Precipitation timeline aggregation.
//!
//! ```text
//!        lookback                         lookahead
//!   ├──────────────────┤ ref ├──────────────────────────┤
//!   [ref − lb,      ref)     (ref,            ref + la]
//!        past_mm                    future_mm
//! ```
//!
//! A sample stamped exactly at the reference instant belongs to neither
//! window.  When the lookback start falls before the reference's calendar
//! day the forecast alone does not cover it, so the history of every day in
//! between is stitched in front of the forecast with [`merge_timeline`].
//! A 24 h lookback spans two such days after a spring-forward night.

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use log::debug;

use super::WeatherSample;
use crate::error::WeatherError;

/// Rain totals for the two windows around a reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PrecipitationTotals {
    pub past_mm: f64,
    pub future_mm: f64,
}

/// Sum precipitation into the lookback and lookahead windows around
/// `reference`.
pub fn aggregate<Tz: TimeZone>(
    samples: &[WeatherSample],
    reference: &DateTime<Tz>,
    lookback_hours: u32,
    lookahead_hours: u32,
) -> PrecipitationTotals {
    let reference = reference.with_timezone(&Utc);
    let start = TimeDelta::try_hours(i64::from(lookback_hours))
        .and_then(|d| reference.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let end = TimeDelta::try_hours(i64::from(lookahead_hours))
        .and_then(|d| reference.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    let mut totals = PrecipitationTotals::default();
    for sample in samples {
        let t = sample.timestamp;
        if t >= start && t < reference {
            totals.past_mm += sample.precipitation_mm;
        } else if t > reference && t <= end {
            totals.future_mm += sample.precipitation_mm;
        }
    }

    debug!(
        "Timeline: {} samples, past {:.2} mm since {}, future {:.2} mm until {}",
        samples.len(),
        totals.past_mm,
        start,
        totals.future_mm,
        end
    );
    totals
}

/// Local calendar days whose history must be fetched, oldest first: every
/// day from the lookback start's up to, not including, the reference's own.
pub fn history_days<Tz: TimeZone>(reference: &DateTime<Tz>, lookback_hours: u32) -> Vec<NaiveDate> {
    let Some(start) = TimeDelta::try_hours(i64::from(lookback_hours))
        .and_then(|d| reference.clone().checked_sub_signed(d))
    else {
        return Vec::new();
    };
    let today = reference.date_naive();
    start
        .date_naive()
        .iter_days()
        .take_while(|day| *day < today)
        .collect()
}

/// Concatenate `history` in front of `forecast`.
///
/// Each source must already be chronological.  Where the two overlap the
/// forecast wins: history samples at or after the first forecast sample are
/// dropped.
pub fn merge_timeline(
    mut history: Vec<WeatherSample>,
    forecast: Vec<WeatherSample>,
) -> Result<Vec<WeatherSample>, WeatherError> {
    if !is_chronological(&history) {
        return Err(WeatherError::Unordered("history"));
    }
    if !is_chronological(&forecast) {
        return Err(WeatherError::Unordered("forecast"));
    }

    if let Some(first) = forecast.first() {
        let cut = history.partition_point(|s| s.timestamp < first.timestamp);
        if cut < history.len() {
            debug!(
                "Timeline: dropping {} history samples overlapping the forecast",
                history.len() - cut
            );
        }
        history.truncate(cut);
    }
    history.extend(forecast);
    Ok(history)
}

fn is_chronological(samples: &[WeatherSample]) -> bool {
    samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp)
}
