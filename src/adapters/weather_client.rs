//! weatherapi.com client.
//!
//! Implements [`WeatherPort`] and [`ConnectivityPort`] on top of any
//! [`HttpPort`].  URLs come from the configured templates:
//!
//! | Placeholder  | Replaced with                      |
//! |--------------|------------------------------------|
//! | `{key}`      | API key                            |
//! | `{location}` | location, percent-encoded          |
//! | `{date}`     | history day as `YYYY-MM-DD`        |

use chrono::{NaiveDate, TimeZone};
use log::{debug, info};

use crate::app::ports::{ConnectivityPort, HttpPort, WeatherPort};
use crate::config::{NetworkConfig, WeatherApiConfig};
use crate::error::WeatherError;
use crate::weather::api::{parse_forecast, parse_history};
use crate::weather::{Forecast, WeatherSample};

pub struct WeatherApiClient<T, Tz> {
    http: T,
    /// Zone the provider's hour stamps are in.
    tz: Tz,
    forecast_url: String,
    history_template: String,
    check_online_url: String,
}

impl<T: HttpPort, Tz: TimeZone> WeatherApiClient<T, Tz> {
    pub fn new(http: T, tz: Tz, api: &WeatherApiConfig, network: &NetworkConfig) -> Self {
        let location = urlencoding::encode(&api.location);
        let fill = |template: &str| {
            template
                .replace("{key}", &api.api_key)
                .replace("{location}", &location)
        };
        Self {
            http,
            tz,
            forecast_url: fill(&api.forecast_url),
            history_template: fill(&api.history_url),
            check_online_url: network.check_online_url.clone(),
        }
    }

    pub fn history_url(&self, date: NaiveDate) -> String {
        self.history_template
            .replace("{date}", &date.format("%Y-%m-%d").to_string())
    }
}

impl<T: HttpPort, Tz: TimeZone> WeatherPort for WeatherApiClient<T, Tz> {
    fn fetch_forecast(&mut self) -> Result<Forecast, WeatherError> {
        let body = self.http.get(&self.forecast_url)?;
        let forecast = parse_forecast(&body, &self.tz)?;
        debug!("Weather: forecast with {} hourly samples", forecast.samples.len());
        Ok(forecast)
    }

    fn fetch_history(&mut self, date: NaiveDate) -> Result<Vec<WeatherSample>, WeatherError> {
        let url = self.history_url(date);
        let body = self.http.get(&url)?;
        let samples = parse_history(&body, &self.tz)?;
        debug!("Weather: history for {} with {} hourly samples", date, samples.len());
        Ok(samples)
    }
}

impl<T: HttpPort, Tz: TimeZone> ConnectivityPort for WeatherApiClient<T, Tz> {
    fn is_online(&mut self) -> bool {
        if self.check_online_url.is_empty() {
            return true;
        }
        match self.http.get(&self.check_online_url) {
            Ok(_) => true,
            Err(e) => {
                info!("Weather: online check failed: {}", e);
                false
            }
        }
    }
}
