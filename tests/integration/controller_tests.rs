//! Integration tests for the Controller → Decision → valve pipeline.
//!
//! These run on the host and drive whole ticks through the mock adapters,
//! checking what got watered, what got skipped and what got recorded.

use chrono::{DateTime, NaiveDate, Utc};

use irrigator::app::controller::Controller;
use irrigator::app::events::ValveOutcome;
use irrigator::config::IrrigationConfig;
use irrigator::decision::Reason;
use irrigator::error::{ActuationError, Error, WeatherError};
use irrigator::schedule::TimepointKind;

use super::mock_hw::{hourly, MockNet, MockRecorder, MockValves};

/// Three valves.  Each has a 06:00 primary on Wednesday and a 15:00
/// secondary every day.
fn config(strict_secondary: bool) -> IrrigationConfig {
    let json = format!(
        r#"{{
            "valves": [
                {{"id": "front", "name": "Front lawn", "pin": 16}},
                {{"id": "beds", "name": "Flower beds", "pin": 17}},
                {{"id": "garden", "name": "Vegetables", "pin": 18}}
            ],
            "default_timepoints": [
                {{"days": [3], "hour": 6, "minute": 0, "kind": "primary", "duration_secs": 600}},
                {{"days": [0,1,2,3,4,5,6], "hour": 15, "minute": 0, "kind": "secondary", "duration_secs": 120}}
            ],
            "features": {{"use_weather": true, "secondary_requires_sunny_and_dry": {strict_secondary}}},
            "weather_api": {{"api_key": "test"}}
        }}"#
    );
    IrrigationConfig::from_json(&json).unwrap()
}

/// 2024-06-05 is a Wednesday.
fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2024, 6, 5)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
        .and_utc()
}

fn midnight() -> DateTime<Utc> {
    at(0, 0)
}

// ── Failure isolation ─────────────────────────────────────────

#[test]
fn broken_valve_does_not_block_the_rest() {
    let mut c = Controller::new(config(false));
    let mut net = MockNet::sunny();
    let mut valves = MockValves {
        failing: vec!["beds"],
        ..MockValves::default()
    };
    let mut rec = MockRecorder::default();

    let report = c.tick(&at(6, 0), &mut net, &mut valves, &mut rec);

    assert_eq!(
        valves.opened,
        vec![("front".to_string(), 600), ("garden".to_string(), 600)]
    );
    assert_eq!(report.valves.len(), 3);
    assert_eq!(report.watered().count(), 2);
    assert!(matches!(
        &report.valves[1].outcome,
        ValveOutcome::Failed(Error::ActuationFailure { valve_id, source: ActuationError::PinWrite { .. } })
            if valve_id == "beds"
    ));
    assert_eq!(rec.events.len(), 2);
    assert_eq!(rec.errors.len(), 1);
}

#[test]
fn recorder_failure_does_not_stop_watering() {
    let mut c = Controller::new(config(false));
    let mut net = MockNet::sunny();
    let mut valves = MockValves::default();
    let mut rec = MockRecorder {
        broken: true,
        ..MockRecorder::default()
    };

    let report = c.tick(&at(6, 0), &mut net, &mut valves, &mut rec);
    assert_eq!(valves.opened.len(), 3);
    assert_eq!(report.watered().count(), 3);
    assert_eq!(rec.events.len(), 3);
}

// ── Rain ──────────────────────────────────────────────────────

#[test]
fn recent_rain_skips_primary() {
    let mut c = Controller::new(config(false));
    let mut net = MockNet::sunny();
    // 5 mm/h from midnight: 30 mm in the six hours before 06:00.
    net.forecast = hourly(midnight(), 24, 0.0);
    for s in net.forecast.iter_mut().take(6) {
        s.precipitation_mm = 5.0;
    }
    let mut valves = MockValves::default();
    let mut rec = MockRecorder::default();

    let report = c.tick(&at(6, 0), &mut net, &mut valves, &mut rec);
    assert!(valves.opened.is_empty());
    for v in &report.valves {
        match v.outcome {
            ValveOutcome::Skipped {
                reason: Reason::RainedRecently { past_mm },
            } => assert!((past_mm - 30.0).abs() < 1e-9),
            ref other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert!(rec.events.is_empty());
    assert!(rec.errors.is_empty());
}

#[test]
fn forecast_rain_skips_secondary_even_when_hot() {
    let mut c = Controller::new(config(false));
    let mut net = MockNet::sunny().with_current(95.0, 10, 1000);
    // 2 mm/h through the evening: 12 mm in the six hours after 15:00.
    net.forecast = hourly(midnight(), 24, 0.0);
    for s in net.forecast.iter_mut().skip(16).take(6) {
        s.precipitation_mm = 2.0;
    }
    let mut valves = MockValves::default();
    let mut rec = MockRecorder::default();

    let report = c.tick(&at(15, 0), &mut net, &mut valves, &mut rec);
    assert!(valves.opened.is_empty());
    assert!(report
        .valves
        .iter()
        .all(|v| matches!(v.outcome, ValveOutcome::Skipped { reason: Reason::RainForecast { .. } })));
}

#[test]
fn rain_at_the_reference_hour_counts_nowhere() {
    let mut c = Controller::new(config(false));
    let mut net = MockNet::sunny();
    net.forecast = hourly(midnight(), 24, 0.0);
    net.forecast[6].precipitation_mm = 50.0;
    let mut valves = MockValves::default();
    let mut rec = MockRecorder::default();

    let report = c.tick(&at(6, 0), &mut net, &mut valves, &mut rec);
    assert_eq!(report.watered().count(), 3);
}

// ── Secondary policy ──────────────────────────────────────────

#[test]
fn hot_afternoon_triggers_secondary() {
    let mut c = Controller::new(config(false));
    let mut net = MockNet::sunny().with_current(86.0, 70, 1183);
    let mut valves = MockValves::default();
    let mut rec = MockRecorder::default();

    let report = c.tick(&at(15, 0), &mut net, &mut valves, &mut rec);
    assert_eq!(valves.opened.len(), 3);
    assert!(valves.opened.iter().all(|(_, secs)| *secs == 120));
    assert!(rec.events.iter().all(|e| e.kind == TimepointKind::Secondary && e.had_weather));
    assert!(report
        .valves
        .iter()
        .all(|v| matches!(v.outcome, ValveOutcome::Watered { reason: Reason::HotAndDry, .. })));
}

#[test]
fn mild_afternoon_skips_secondary() {
    let mut c = Controller::new(config(false));
    let mut net = MockNet::sunny().with_current(72.0, 20, 1000);
    let mut valves = MockValves::default();
    let mut rec = MockRecorder::default();

    let report = c.tick(&at(15, 0), &mut net, &mut valves, &mut rec);
    assert!(valves.opened.is_empty());
    assert!(matches!(
        report.valves[0].outcome,
        ValveOutcome::Skipped { reason: Reason::NotHot { .. } }
    ));
}

#[test]
fn strict_secondary_rejects_humid_and_cloudy() {
    let mut valves = MockValves::default();
    let mut rec = MockRecorder::default();

    let mut c = Controller::new(config(true));
    let mut humid = MockNet::sunny().with_current(90.0, 60, 1000);
    let report = c.tick(&at(15, 0), &mut humid, &mut valves, &mut rec);
    assert!(matches!(
        report.valves[0].outcome,
        ValveOutcome::Skipped { reason: Reason::TooHumid { humidity_pct: 60 } }
    ));

    let mut c = Controller::new(config(true));
    let mut cloudy = MockNet::sunny().with_current(90.0, 20, 1003);
    let report = c.tick(&at(15, 0), &mut cloudy, &mut valves, &mut rec);
    assert!(matches!(
        report.valves[0].outcome,
        ValveOutcome::Skipped { reason: Reason::NotSunny { condition_code: 1003 } }
    ));

    let mut c = Controller::new(config(true));
    let mut ideal = MockNet::sunny().with_current(90.0, 20, 1000);
    let report = c.tick(&at(15, 0), &mut ideal, &mut valves, &mut rec);
    assert_eq!(report.watered().count(), 3);
}

// ── Weather failures ──────────────────────────────────────────

#[test]
fn offline_waters_primary_and_records_once() {
    let mut c = Controller::new(config(false));
    let mut net = MockNet::offline();
    let mut valves = MockValves::default();
    let mut rec = MockRecorder::default();

    let report = c.tick(&at(6, 0), &mut net, &mut valves, &mut rec);
    assert_eq!(net.online_checks, 1);
    assert_eq!(net.forecast_calls, 0);
    assert_eq!(report.watered().count(), 3);
    assert_eq!(rec.errors, vec![Error::WeatherUnavailable(WeatherError::Offline)]);
    assert!(rec.events.iter().all(|e| !e.had_weather));
}

#[test]
fn provider_error_skips_secondary() {
    let mut c = Controller::new(config(false));
    let mut net = MockNet::sunny();
    net.forecast_error = Some(WeatherError::Status(500));
    let mut valves = MockValves::default();
    let mut rec = MockRecorder::default();

    let report = c.tick(&at(15, 0), &mut net, &mut valves, &mut rec);
    assert!(valves.opened.is_empty());
    assert!(report
        .valves
        .iter()
        .all(|v| v.outcome == ValveOutcome::Skipped { reason: Reason::NoWeather }));
    assert_eq!(rec.errors.len(), 1);
}

#[test]
fn early_tick_fetches_yesterdays_history() {
    let mut cfg = config(false);
    for valve in &mut cfg.valves {
        valve.timepoints[0].hour = 3;
    }
    let mut c = Controller::new(cfg);
    let mut net = MockNet::sunny();
    // 21:00..23:00 yesterday, 4 mm each.
    net.history = hourly(at(0, 0) - chrono::TimeDelta::hours(3), 3, 4.0);
    net.forecast = hourly(midnight(), 24, 0.0);
    let mut valves = MockValves::default();
    let mut rec = MockRecorder::default();

    let report = c.tick(&at(3, 0), &mut net, &mut valves, &mut rec);
    assert_eq!(net.history_requests, vec![NaiveDate::from_ymd_opt(2024, 6, 4).unwrap()]);
    assert!(report.valves.iter().all(|v| matches!(
        v.outcome,
        ValveOutcome::Skipped { reason: Reason::RainedRecently { past_mm } } if (past_mm - 12.0).abs() < 1e-9
    )));
}

#[test]
fn unordered_history_is_weather_unavailable() {
    let mut cfg = config(false);
    for valve in &mut cfg.valves {
        valve.timepoints[0].hour = 3;
    }
    let mut c = Controller::new(cfg);
    let mut net = MockNet::sunny();
    let mut history = hourly(at(0, 0) - chrono::TimeDelta::hours(3), 3, 0.0);
    history.reverse();
    net.history = history;
    let mut valves = MockValves::default();
    let mut rec = MockRecorder::default();

    let report = c.tick(&at(3, 0), &mut net, &mut valves, &mut rec);
    assert_eq!(report.watered().count(), 3);
    assert_eq!(
        rec.errors,
        vec![Error::WeatherUnavailable(WeatherError::Unordered("history"))]
    );
}

// ── Timing ────────────────────────────────────────────────────

#[test]
fn each_minute_dispatches_once() {
    let mut c = Controller::new(config(false));
    let mut net = MockNet::sunny();
    let mut valves = MockValves::default();
    let mut rec = MockRecorder::default();

    for second in [0, 10, 30, 59] {
        let now = at(6, 0) + chrono::TimeDelta::seconds(second);
        c.tick(&now, &mut net, &mut valves, &mut rec);
    }
    assert_eq!(valves.opened.len(), 3);
    assert_eq!(net.forecast_calls, 1);

    // Next matching minute is a week later; 06:01 matches nothing.
    let report = c.tick(&at(6, 1), &mut net, &mut valves, &mut rec);
    assert!(report.valves.is_empty());
    assert!(!report.suppressed);
}

#[test]
fn other_days_are_quiet() {
    let mut c = Controller::new(config(false));
    let mut net = MockNet::sunny();
    let mut valves = MockValves::default();
    let mut rec = MockRecorder::default();

    // Thursday 06:00: primary is Wednesday-only.
    let thursday = at(6, 0) + chrono::TimeDelta::days(1);
    let report = c.tick(&thursday, &mut net, &mut valves, &mut rec);
    assert!(report.valves.is_empty());
    assert_eq!(net.online_checks, 0);
}
