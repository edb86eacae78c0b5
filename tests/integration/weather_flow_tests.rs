//! End-to-end weather flow: weatherapi.com JSON → client → snapshot →
//! decision, plus the NVS-backed event log as a recorder.

use std::collections::HashMap;

use chrono::{FixedOffset, NaiveDate, TimeZone};

use irrigator::adapters::event_log::{EventLog, RecordBody};
use irrigator::adapters::log_sink::LogRecorder;
use irrigator::adapters::nvs::NvsAdapter;
use irrigator::adapters::weather_client::WeatherApiClient;
use irrigator::app::controller::Controller;
use irrigator::app::ports::HttpPort;
use irrigator::config::IrrigationConfig;
use irrigator::error::WeatherError;
use irrigator::schedule::TimepointKind;
use irrigator::weather::collect_snapshot;

use super::mock_hw::MockValves;

/// Serves bodies by URL substring.
#[derive(Default)]
struct ScriptedHttp {
    routes: HashMap<&'static str, String>,
}

impl HttpPort for ScriptedHttp {
    fn get(&mut self, url: &str) -> Result<Vec<u8>, WeatherError> {
        self.routes
            .iter()
            .find(|(pattern, _)| url.contains(**pattern))
            .map(|(_, body)| body.clone().into_bytes())
            .ok_or(WeatherError::Status(404))
    }
}

fn hours_json(date: &str, mm: impl Fn(u32) -> f64) -> String {
    let hours: Vec<String> = (0..24)
        .map(|h| format!(r#"{{"time": "{date} {h:02}:00", "precip_mm": {}}}"#, mm(h)))
        .collect();
    format!(r#"{{"date": "{date}", "hour": [{}]}}"#, hours.join(","))
}

/// Forecast for 2024-05-31 and 2024-06-01 with rain 06:00-08:00 on the 31st.
fn forecast_body(temp_f: f64, humidity: u8) -> String {
    format!(
        r#"{{
            "location": {{"name": "Testville", "tz_id": "America/New_York"}},
            "current": {{"temp_f": {temp_f}, "humidity": {humidity},
                         "condition": {{"text": "Sunny", "code": 1000}}}},
            "forecast": {{"forecastday": [{}, {}]}}
        }}"#,
        hours_json("2024-05-31", |h| if (6..=8).contains(&h) { 5.0 } else { 0.0 }),
        hours_json("2024-06-01", |_| 0.0),
    )
}

/// History for 2024-05-30: 1 mm every hour.
fn history_body() -> String {
    format!(
        r#"{{"forecast": {{"forecastday": [{}]}}}}"#,
        hours_json("2024-05-30", |_| 1.0)
    )
}

fn config() -> IrrigationConfig {
    IrrigationConfig::from_json(
        r#"{
            "valves": [{"id": "lawn", "name": "Lawn", "pin": 16, "timepoints": [
                {"days": [5], "hour": 2, "minute": 0, "kind": "primary", "duration_secs": 60},
                {"days": [5], "hour": 14, "minute": 0, "kind": "secondary", "duration_secs": 30}
            ]}],
            "weather_api": {"api_key": "k", "location": "10001"}
        }"#,
    )
    .unwrap()
}

fn edt() -> FixedOffset {
    FixedOffset::west_opt(4 * 3600).unwrap()
}

fn client(temp_f: f64, humidity: u8) -> WeatherApiClient<ScriptedHttp, FixedOffset> {
    let mut http = ScriptedHttp::default();
    http.routes.insert("forecast.json", forecast_body(temp_f, humidity));
    http.routes.insert("history.json", history_body());
    http.routes.insert("generate_204", String::new());
    let cfg = config();
    WeatherApiClient::new(http, edt(), &cfg.weather_api, &cfg.network)
}

#[test]
fn snapshot_windows_span_history_and_forecast() {
    let cfg = config();
    let mut client = client(70.0, 50);
    // 02:00 local on Friday 2024-05-31; lookback reaches 20:00 the day before.
    let reference = edt().with_ymd_and_hms(2024, 5, 31, 2, 0, 0).unwrap();

    let snapshot = collect_snapshot(&mut client, &reference, &cfg.thresholds).unwrap();
    // 20:00..23:00 history (4 × 1 mm) plus 00:00, 01:00 forecast (0 mm).
    assert!((snapshot.past_precipitation_mm - 4.0).abs() < 1e-9);
    // 03:00..08:00 forecast: 06, 07, 08 at 5 mm.
    assert!((snapshot.future_precipitation_mm - 15.0).abs() < 1e-9);
    assert_eq!(snapshot.current.condition_text, "Sunny");
}

#[test]
fn forecast_rain_skips_primary_end_to_end() {
    let mut c = Controller::new(config());
    let mut net = client(70.0, 50);
    let mut valves = MockValves::default();
    let mut rec = LogRecorder::new();

    let now = edt().with_ymd_and_hms(2024, 5, 31, 2, 0, 0).unwrap();
    let report = c.tick(&now, &mut net, &mut valves, &mut rec);
    assert!(report.weather_fetched);
    assert_eq!(report.valves.len(), 1);
    assert_eq!(report.watered().count(), 0);
    assert!(valves.opened.is_empty());
}

#[test]
fn hot_afternoon_is_logged_to_nvs() {
    let mut c = Controller::new(config());
    let mut net = client(91.0, 25);
    let mut valves = MockValves::default();
    let mut rec = (LogRecorder::new(), EventLog::open(NvsAdapter::new().unwrap()));

    // 14:00: only the 08:00 shower (5 mm) is inside the lookback.
    let now = edt().with_ymd_and_hms(2024, 5, 31, 14, 0, 0).unwrap();
    let report = c.tick(&now, &mut net, &mut valves, &mut rec);
    assert_eq!(report.watered().count(), 1);
    assert_eq!(valves.opened, vec![("lawn".to_string(), 30)]);

    let records = rec.1.read_all();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].at, now.timestamp());
    match &records[0].body {
        RecordBody::Watered {
            valve_id,
            kind,
            duration_secs,
            temperature_f,
            ..
        } => {
            assert_eq!(valve_id.as_str(), "lawn");
            assert_eq!(*kind, TimepointKind::Secondary);
            assert_eq!(*duration_secs, 30);
            assert_eq!(*temperature_f, Some(91.0));
        }
        other => panic!("unexpected record {other:?}"),
    }
}

#[test]
fn missing_history_endpoint_is_recorded() {
    let mut http = ScriptedHttp::default();
    http.routes.insert("forecast.json", forecast_body(70.0, 50));
    http.routes.insert("generate_204", String::new());
    let cfg = config();
    let mut net = WeatherApiClient::new(http, edt(), &cfg.weather_api, &cfg.network);
    let mut c = Controller::new(cfg);
    let mut valves = MockValves::default();
    let mut rec = (LogRecorder::new(), EventLog::open(NvsAdapter::new().unwrap()));

    // 02:00 needs yesterday's history, which 404s.
    let now = edt().with_ymd_and_hms(2024, 5, 31, 2, 0, 0).unwrap();
    let report = c.tick(&now, &mut net, &mut valves, &mut rec);
    assert!(report.weather_fetched);
    assert_eq!(report.watered().count(), 1);

    let records = rec.1.read_all();
    assert_eq!(records.len(), 2);
    assert!(matches!(&records[0].body, RecordBody::Failure { message } if message.contains("HTTP 404")));
    assert!(matches!(records[1].body, RecordBody::Watered { temperature_f: None, .. }));
}

#[test]
fn offline_probe_skips_provider() {
    let mut http = ScriptedHttp::default();
    http.routes.insert("forecast.json", forecast_body(70.0, 50));
    let cfg = config();
    let mut net = WeatherApiClient::new(http, edt(), &cfg.weather_api, &cfg.network);
    let mut c = Controller::new(cfg);
    let mut valves = MockValves::default();
    let mut rec = (LogRecorder::new(), EventLog::open(NvsAdapter::new().unwrap()));

    let now = edt().with_ymd_and_hms(2024, 5, 31, 2, 0, 0).unwrap();
    let report = c.tick(&now, &mut net, &mut valves, &mut rec);
    assert!(!report.weather_fetched);
    assert_eq!(report.watered().count(), 1);

    let records = rec.1.read_all();
    assert!(matches!(&records[0].body, RecordBody::Failure { message } if message.contains("offline")));
}

#[test]
fn history_day_is_in_request_url() {
    let client = client(70.0, 50);
    let url = client.history_url(NaiveDate::from_ymd_opt(2024, 5, 30).unwrap());
    assert!(url.contains("history.json"));
    assert!(url.contains("q=10001"));
    assert!(url.ends_with("dt=2024-05-30"));
}
