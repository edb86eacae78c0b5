//! HTTP transport adapter.
//!
//! Implements [`HttpPort`]: a blocking GET that returns the body.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::http::client::EspHttpConnection`
//!   with the built-in CA bundle for HTTPS.
//! - **all other targets**: [`NullTransport`], which always fails, so host
//!   builds run with weather unavailable.

use crate::app::ports::HttpPort;
use crate::error::WeatherError;

/// Response bodies beyond this are rejected rather than buffered.
pub const MAX_BODY_BYTES: usize = 96 * 1024;

#[cfg(target_os = "espidf")]
pub use esp::EspHttpTransport;

#[cfg(target_os = "espidf")]
mod esp {
    use core::time::Duration;

    use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
    use esp_idf_svc::http::Method;
    use log::debug;

    use super::MAX_BODY_BYTES;
    use crate::app::ports::HttpPort;
    use crate::error::WeatherError;

    pub struct EspHttpTransport {
        timeout: Duration,
    }

    impl EspHttpTransport {
        pub fn new(timeout: Duration) -> Self {
            Self { timeout }
        }
    }

    impl HttpPort for EspHttpTransport {
        fn get(&mut self, url: &str) -> Result<Vec<u8>, WeatherError> {
            let transport = |e: esp_idf_svc::sys::EspError| WeatherError::Transport(e.to_string());

            let mut conn = EspHttpConnection::new(&Configuration {
                timeout: Some(self.timeout),
                crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
                ..Default::default()
            })
            .map_err(transport)?;

            conn.initiate_request(Method::Get, url, &[("accept", "application/json")])
                .map_err(transport)?;
            conn.initiate_response().map_err(transport)?;

            let status = conn.status();
            if !(200..300).contains(&status) {
                return Err(WeatherError::Status(status));
            }

            let mut body = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = conn.read(&mut chunk).map_err(transport)?;
                if n == 0 {
                    break;
                }
                if body.len() + n > MAX_BODY_BYTES {
                    return Err(WeatherError::Transport(format!(
                        "response exceeds {} bytes",
                        MAX_BODY_BYTES
                    )));
                }
                body.extend_from_slice(&chunk[..n]);
            }
            debug!("HTTP: GET {} -> {} ({} bytes)", url, status, body.len());
            Ok(body)
        }
    }
}

/// Transport for targets without a network stack.
#[derive(Debug, Default)]
pub struct NullTransport;

impl HttpPort for NullTransport {
    fn get(&mut self, _url: &str) -> Result<Vec<u8>, WeatherError> {
        Err(WeatherError::Transport("no HTTP transport on this target".into()))
    }
}
