//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter          | Implements         | Connects to              |
//! |------------------|--------------------|--------------------------|
//! | `event_log`      | EventRecorder      | NVS ring buffer          |
//! | `hardware`       | ValveActuatorPort  | GPIO relay pins          |
//! | `http`           | HttpPort           | ESP-IDF HTTP client      |
//! | `log_sink`       | EventRecorder      | Serial log output        |
//! | `nvs`            | ConfigPort         | NVS / in-memory store    |
//! |                  | StoragePort        |                          |
//! | `time`           | (wall clock)       | SNTP-synced system time  |
//! | `weather_client` | WeatherPort        | weatherapi.com           |
//! |                  | ConnectivityPort   | online probe URL         |
//! | `wifi`           | (link upkeep)      | ESP-IDF WiFi STA         |

pub mod event_log;
pub mod hardware;
pub mod http;
pub mod log_sink;
pub mod nvs;
pub mod time;
pub mod weather_client;
pub mod wifi;
