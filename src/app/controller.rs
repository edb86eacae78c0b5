//! Control loop: the hexagonal core.
//!
//! [`Controller`] owns the validated configuration and the once-per-minute
//! trigger guard.  Every poll tick it walks the valves in declared order:
//!
//! ```text
//!   now ──▶ match_timepoint (per valve) ──▶ any match?
//!                                              │ yes
//!                                              ▼
//!            ConnectivityPort + WeatherPort ──▶ WeatherStatus (once per tick)
//!                                              │
//!                      per matched valve       ▼
//!                 decide ──▶ ValveActuatorPort ──▶ EventRecorder
//! ```
//!
//! A failure on one valve is recorded and never blocks the valves after it.

use core::time::Duration;

use chrono::{DateTime, TimeZone, Timelike};
use log::{debug, error, info, warn};

use crate::config::IrrigationConfig;
use crate::decision::{decide, DecisionRules};
use crate::error::{Error, RecorderError, WeatherError};
use crate::schedule::{match_timepoint, MinuteStamp};
use crate::weather::{collect_snapshot, WeatherStatus};

use super::events::{TickReport, ValveOutcome, ValveReport, WateringEvent};
use super::ports::{ConnectivityPort, EventRecorder, ValveActuatorPort, WeatherPort};

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

pub struct Controller {
    config: IrrigationConfig,
    rules: DecisionRules,
    /// Minute of the last tick that dispatched at least one valve.
    last_dispatch: Option<MinuteStamp>,
    tick_count: u64,
}

impl Controller {
    /// `config` must already be validated.
    pub fn new(config: IrrigationConfig) -> Self {
        let rules = DecisionRules::from_config(&config);
        info!(
            "Controller: {} valves, weather {}",
            config.valves.len(),
            if config.features.use_weather { "on" } else { "off" }
        );
        Self {
            config,
            rules,
            last_dispatch: None,
            tick_count: 0,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Poll interval between ticks.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.config.poll_interval_ms))
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle at local time `now`.
    ///
    /// `net` satisfies **both** [`WeatherPort`] and [`ConnectivityPort`]
    /// since both go over the same network adapter.
    pub fn tick<Tz: TimeZone>(
        &mut self,
        now: &DateTime<Tz>,
        net: &mut (impl WeatherPort + ConnectivityPort),
        valves: &mut impl ValveActuatorPort,
        recorder: &mut impl EventRecorder,
    ) -> TickReport {
        self.tick_count += 1;
        let mut report = TickReport::default();

        let stamp = MinuteStamp::of(now);
        if self.last_dispatch == Some(stamp) {
            report.suppressed = true;
            return report;
        }

        let matched: Vec<_> = self
            .config
            .valves
            .iter()
            .filter_map(|v| match_timepoint(v, now).map(|tp| (v, tp)))
            .collect();
        if matched.is_empty() {
            return report;
        }
        self.last_dispatch = Some(stamp);
        debug!(
            "Controller: tick {} matched {} valve(s) at {:02}:{:02}",
            self.tick_count,
            matched.len(),
            stamp.hour,
            stamp.minute
        );

        let weather = resolve_weather(&self.config, now, net, recorder, &mut report);

        for (valve, tp) in matched {
            let decision = decide(tp.kind, &weather, &self.rules);
            let outcome = if decision.water {
                info!(
                    "Controller: watering '{}' ({}) for {}s, {}",
                    valve.id, tp.kind, tp.duration_secs, decision.reason
                );
                match valves.actuate(&valve.id, tp.duration_secs) {
                    Ok(()) => {
                        let event = WateringEvent {
                            valve_id: &valve.id,
                            valve_name: &valve.name,
                            kind: tp.kind,
                            duration_secs: tp.duration_secs,
                            weather: weather.snapshot(),
                            at: now.fixed_offset(),
                        };
                        log_recorder_failure(recorder.record_event(&event));
                        ValveOutcome::Watered {
                            duration_secs: tp.duration_secs,
                            reason: decision.reason,
                        }
                    }
                    Err(source) => {
                        error!("Controller: valve '{}' actuation failed: {}", valve.id, source);
                        let err = Error::ActuationFailure {
                            valve_id: valve.id.clone(),
                            source,
                        };
                        log_recorder_failure(recorder.record_error(&err));
                        ValveOutcome::Failed(err)
                    }
                }
            } else {
                info!(
                    "Controller: skipping '{}' ({}), {}",
                    valve.id, tp.kind, decision.reason
                );
                ValveOutcome::Skipped {
                    reason: decision.reason,
                }
            };
            report.valves.push(ValveReport {
                valve_id: valve.id.clone(),
                kind: tp.kind,
                outcome,
            });
        }

        report
    }

    /// Time left in the minute that was just dispatched, if `now` is still
    /// inside it.  The main loop sleeps this out instead of polling.
    pub fn resume_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<Duration> {
        if self.last_dispatch != Some(MinuteStamp::of(now)) {
            return None;
        }
        // Leap seconds report nanos >= 1e9; fold them into second 59.
        let elapsed = Duration::new(u64::from(now.second().min(59)), now.nanosecond() % 1_000_000_000);
        Duration::from_secs(60).checked_sub(elapsed)
    }
}

/// Work out this tick's weather from the flags and the connectivity probe.
fn resolve_weather<Tz: TimeZone>(
    config: &IrrigationConfig,
    now: &DateTime<Tz>,
    net: &mut (impl WeatherPort + ConnectivityPort),
    recorder: &mut impl EventRecorder,
    report: &mut TickReport,
) -> WeatherStatus {
    if !config.features.use_weather {
        return WeatherStatus::Disabled;
    }

    let result = if net.is_online() {
        report.weather_fetched = true;
        collect_snapshot(net, now, &config.thresholds)
    } else {
        Err(WeatherError::Offline)
    };

    match result {
        Ok(snapshot) => {
            info!(
                "Controller: weather {:.1}F {}% '{}', rain past {:.1} mm / next {:.1} mm",
                snapshot.current.temperature_f,
                snapshot.current.humidity_pct,
                snapshot.current.condition_text,
                snapshot.past_precipitation_mm,
                snapshot.future_precipitation_mm
            );
            WeatherStatus::Available(snapshot)
        }
        Err(e) => {
            warn!("Controller: weather unavailable: {}", e);
            log_recorder_failure(recorder.record_error(&Error::WeatherUnavailable(e.clone())));
            WeatherStatus::Unavailable(e)
        }
    }
}

fn log_recorder_failure(result: Result<(), RecorderError>) {
    if let Err(e) = result {
        warn!("Controller: could not record: {}", e);
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
