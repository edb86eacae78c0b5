//! WiFi station-mode adapter.
//!
//! Keeps the station link up between ticks.  Reachability of the wider
//! internet is a separate question answered by the weather client's
//! online probe.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: [`WifiStation`] drives `esp_idf_svc::wifi`.
//! - **all other targets**: only credential validation and [`Backoff`]
//!   are compiled, for host-side tests.
//!
//! ## Reconnection policy
//!
//! On disconnect the adapter waits an exponential backoff (2 s → 4 s →
//! 8 s … capped at 60 s) before retrying.

use core::time::Duration;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WifiError {
    #[error("SSID invalid (must be 1-32 printable ASCII bytes)")]
    InvalidSsid,
    #[error("password invalid (must be 8-64 bytes for WPA2, or empty for open)")]
    InvalidPassword,
    #[error("WiFi connection failed: {0}")]
    ConnectionFailed(String),
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_credentials(ssid: &str, password: &str) -> Result<(), WifiError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(WifiError::InvalidSsid);
    }
    if !password.is_empty() && !(8..=64).contains(&password.len()) {
        return Err(WifiError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Backoff
// ───────────────────────────────────────────────────────────────

const MIN_BACKOFF_SECS: u64 = 2;
const MAX_BACKOFF_SECS: u64 = 60;

/// Exponential reconnect schedule.
#[derive(Debug, Clone)]
pub struct Backoff {
    delay_secs: u64,
    next_attempt: Option<Instant>,
    attempts: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            delay_secs: MIN_BACKOFF_SECS,
            next_attempt: None,
            attempts: 0,
        }
    }
}

impl Backoff {
    pub fn ready(&self, now: Instant) -> bool {
        self.next_attempt.is_none_or(|at| now >= at)
    }

    pub fn failed(&mut self, now: Instant) {
        self.attempts += 1;
        self.next_attempt = Some(now + Duration::from_secs(self.delay_secs));
        self.delay_secs = (self.delay_secs * 2).min(MAX_BACKOFF_SECS);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn current_delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF station
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::WifiStation;

#[cfg(target_os = "espidf")]
mod esp {
    use std::time::Instant;

    use esp_idf_hal::modem::Modem;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
    use log::{info, warn};

    use super::{validate_credentials, Backoff, WifiError};
    use crate::config::NetworkConfig;

    pub struct WifiStation {
        wifi: BlockingWifi<EspWifi<'static>>,
        backoff: Backoff,
    }

    impl WifiStation {
        pub fn new(
            modem: Modem,
            sysloop: EspSystemEventLoop,
            network: &NetworkConfig,
        ) -> Result<Self, WifiError> {
            validate_credentials(&network.ssid, &network.password)?;
            let failed = |e: esp_idf_svc::sys::EspError| WifiError::ConnectionFailed(e.to_string());

            // NVS is owned by NvsAdapter; the driver keeps its calibration in RAM.
            let esp_wifi = EspWifi::new(modem, sysloop.clone(), None).map_err(failed)?;
            let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop).map_err(failed)?;

            let auth_method = if network.password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            };
            wifi.set_configuration(&Configuration::Client(ClientConfiguration {
                ssid: network
                    .ssid
                    .as_str()
                    .try_into()
                    .map_err(|_| WifiError::InvalidSsid)?,
                password: network
                    .password
                    .as_str()
                    .try_into()
                    .map_err(|_| WifiError::InvalidPassword)?,
                auth_method,
                ..Default::default()
            }))
            .map_err(failed)?;
            wifi.start().map_err(failed)?;
            info!("WiFi: station started for '{}'", network.ssid);

            Ok(Self {
                wifi,
                backoff: Backoff::default(),
            })
        }

        /// Reconnect if the link dropped and the backoff allows it.
        pub fn ensure_connected(&mut self) -> bool {
            if self.wifi.is_connected().unwrap_or(false) {
                return true;
            }
            let now = Instant::now();
            if !self.backoff.ready(now) {
                return false;
            }
            info!(
                "WiFi: connect attempt {} (backoff {:?})",
                self.backoff.attempts() + 1,
                self.backoff.current_delay()
            );
            match self.wifi.connect().and_then(|_| self.wifi.wait_netif_up()) {
                Ok(()) => {
                    self.backoff.reset();
                    info!("WiFi: connected");
                    true
                }
                Err(e) => {
                    warn!("WiFi: connection failed: {}", e);
                    let _ = self.wifi.disconnect();
                    self.backoff.failed(now);
                    false
                }
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
