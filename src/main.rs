//! Irrigator Firmware: Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  ValveBank          WeatherApiClient      NvsAdapter           │
//! │  (ValveActuator)    (Weather+Connectivity)(Config+Storage)     │
//! │  LogRecorder        EventLog              WallClock            │
//! │  (EventRecorder)    (EventRecorder)       (SNTP + TZ)          │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Controller (pure logic)                   │    │
//! │  │  Schedule matcher · Weather timeline · Decision rules  │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::time::Duration;

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::sntp::EspSntp;

use irrigator::adapters::event_log::EventLog;
use irrigator::adapters::hardware::ValveBank;
use irrigator::adapters::http::EspHttpTransport;
use irrigator::adapters::log_sink::LogRecorder;
use irrigator::adapters::nvs::NvsAdapter;
use irrigator::adapters::time::WallClock;
use irrigator::adapters::weather_client::WeatherApiClient;
use irrigator::adapters::wifi::WifiStation;
use irrigator::app::controller::Controller;
use irrigator::app::ports::ConfigPort;
use irrigator::config::IrrigationConfig;
use irrigator::drivers::valve::ValveDriver;

const BUNDLED_CONFIG: &str = include_str!("../config/default.json");
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

type RelayPin = PinDriver<'static, AnyOutputPin, Output>;

// ── Config bootstrap ──────────────────────────────────────────
//
// NVS wins when it holds a valid blob.  On a fresh device the bundled
// JSON is validated and persisted so the next boot reads it from flash.

fn load_config(nvs: &mut NvsAdapter) -> Result<IrrigationConfig> {
    match nvs.load() {
        Ok(Some(config)) => return Ok(config),
        Ok(None) => info!("Config: first boot, using bundled configuration"),
        Err(e) => warn!("Config: stored configuration rejected ({}), using bundled", e),
    }
    let config = IrrigationConfig::from_json(BUNDLED_CONFIG)?;
    if let Err(e) = nvs.save(&config) {
        warn!("Config: could not persist bundled configuration: {}", e);
    }
    Ok(config)
}

fn build_valve_bank(config: &IrrigationConfig) -> Result<ValveBank<RelayPin, FreeRtos>> {
    let mut bank = ValveBank::new(FreeRtos);
    for valve in &config.valves {
        // SAFETY: pin numbers are validated unique, and nothing else in the
        // firmware claims these GPIOs.
        let pin = unsafe { AnyOutputPin::new(valve.pin) };
        let driver = PinDriver::output(pin)?;
        bank.add(valve.id.clone(), ValveDriver::new(driver, valve.pin, valve.active_low));
    }
    Ok(bank)
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Irrigator v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;

    // ── 2. Configuration ──────────────────────────────────────
    let mut nvs = NvsAdapter::new()?;
    let config = load_config(&mut nvs)?;

    let clock = WallClock::new();
    clock.set_timezone(&config.timezone);

    // ── 3. Valves closed before anything else can fail ────────
    let mut valves = build_valve_bank(&config)?;
    if let Err(e) = valves.close_all() {
        error!("Boot: could not close every valve: {}", e);
    }
    info!("Boot: {} valve relay(s) ready", valves.len());

    // ── 4. Network + time sync ────────────────────────────────
    let mut wifi = match WifiStation::new(peripherals.modem, sysloop, &config.network) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!("Boot: WiFi unavailable ({}), weather will be skipped", e);
            None
        }
    };
    if let Some(w) = wifi.as_mut() {
        w.ensure_connected();
    }
    let _sntp = EspSntp::new_default()?;

    let mut net = WeatherApiClient::new(
        EspHttpTransport::new(HTTP_TIMEOUT),
        chrono::Local,
        &config.weather_api,
        &config.network,
    );

    // ── 5. Recorders + controller ─────────────────────────────
    let mut recorder = (LogRecorder::new(), EventLog::open(nvs));
    let mut controller = Controller::new(config);

    info!("Boot: entering control loop");

    // ── 6. Main loop ──────────────────────────────────────────
    loop {
        let Some(now) = clock.now() else {
            info!("Clock: waiting for SNTP sync");
            FreeRtos::delay_ms(1000);
            continue;
        };

        if let Some(w) = wifi.as_mut() {
            w.ensure_connected();
        }

        let report = controller.tick(&now, &mut net, &mut valves, &mut recorder);
        if !report.valves.is_empty() {
            info!(
                "Loop: {} valve(s) handled, {} watered",
                report.valves.len(),
                report.watered().count()
            );
        }

        // After a dispatch, sleep out the rest of that minute.
        let pause = clock
            .now()
            .and_then(|t| controller.resume_after(&t))
            .unwrap_or_else(|| controller.poll_interval());
        FreeRtos::delay_ms(u32::try_from(pause.as_millis()).unwrap_or(u32::MAX));
    }
}
