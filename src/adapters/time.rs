//! Wall-clock time adapter.
//!
//! Provides local time for the schedule matcher.
//!
//! - **`target_os = "espidf"`**: the system clock is set by SNTP; the
//!   POSIX `TZ` rule from the configuration is applied with `tzset()`.
//! - **`not(target_os = "espidf")`**: the host clock and `TZ` as-is.
//!
//! Until SNTP has synced, the RTC starts near 1970; such readings are
//! rejected so no schedule can fire on a bogus date.

use chrono::{DateTime, Local, TimeZone};
use log::info;

/// 2020-01-01T00:00:00Z.  Anything earlier is an unsynced clock.
const EPOCH_2020: i64 = 1_577_836_800;

/// True once the clock reads a plausible date.
pub fn is_plausible<Tz: TimeZone>(t: &DateTime<Tz>) -> bool {
    t.timestamp() >= EPOCH_2020
}

/// Time adapter backed by the system clock.
pub struct WallClock;

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock {
    pub fn new() -> Self {
        Self
    }

    /// Apply a POSIX TZ rule such as `EST5EDT,M3.2.0,M11.1.0`.
    #[cfg(target_os = "espidf")]
    pub fn set_timezone(&self, rule: &str) {
        // SAFETY: called once from main() before any other thread reads the
        // environment.
        unsafe {
            std::env::set_var("TZ", rule);
            esp_idf_sys::tzset();
        }
        info!("Clock: timezone set to '{}'", rule);
    }

    /// Host builds keep the process time zone.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_timezone(&self, rule: &str) {
        info!("Clock(sim): ignoring timezone '{}'", rule);
    }

    /// Current local time, or `None` while the clock is unsynced.
    pub fn now(&self) -> Option<DateTime<Local>> {
        let now = Local::now();
        is_plausible(&now).then_some(now)
    }
}
