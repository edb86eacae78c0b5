//! Schedule matcher.
//!
//! Each valve carries an ordered list of [`WaterTimepoint`]s.  On every poll
//! tick the control loop asks [`match_timepoint`] whether the current local
//! minute hits one of them.  Matching is stateless: nothing about previous
//! ticks is remembered here (the once-per-minute guard lives in the
//! controller and uses [`MinuteStamp`]).
//!
//! ```text
//!   local instant ──▶ (weekday, hour, minute)
//!                            │
//!                            ▼
//!   valve.timepoints ──▶ first tp where
//!                          tp.hour == hour
//!                          tp.minute == minute
//!                          weekday ∈ tp.days
//! ```

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ═══════════════════════════════════════════════════════════════
//  Weekday set
// ═══════════════════════════════════════════════════════════════

/// Set of weekdays, numbered 0 = Sunday through 6 = Saturday.
///
/// Stored as a 7-bit mask.  Serialises as a list of day numbers, e.g.
/// `[1, 3, 5]` for Monday, Wednesday and Friday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const EMPTY: Self = Self(0);
    pub const EVERY_DAY: Self = Self(0x7F);

    /// Build a set from day numbers.  Returns `None` if any day is > 6.
    pub fn from_days(days: &[u8]) -> Option<Self> {
        let mut mask = 0u8;
        for &d in days {
            if d > 6 {
                return None;
            }
            mask |= 1 << d;
        }
        Some(Self(mask))
    }

    pub fn contains(self, day: u8) -> bool {
        day <= 6 && self.0 & (1 << day) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if the two sets share at least one day.
    pub fn overlaps(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Day numbers in ascending order.
    pub fn days(self) -> impl Iterator<Item = u8> {
        (0..7u8).filter(move |&d| self.contains(d))
    }
}

impl Serialize for WeekdaySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Collected first so the sequence length is known up front (postcard
        // rejects unsized sequences).
        let days: Vec<u8> = self.days().collect();
        days.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WeekdaySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let days = Vec::<u8>::deserialize(deserializer)?;
        match days.iter().find(|&&d| d > 6) {
            Some(&bad) => Err(serde::de::Error::invalid_value(
                serde::de::Unexpected::Unsigned(u64::from(bad)),
                &"a weekday number between 0 (Sunday) and 6 (Saturday)",
            )),
            None => Ok(Self::from_days(&days).unwrap_or_default()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Timepoints and valves
// ═══════════════════════════════════════════════════════════════

/// Which decision policy applies when a timepoint fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimepointKind {
    /// Water unless it rained (or will rain) enough.
    Primary,
    /// Extra watering, only when it is hot and dry.
    Secondary,
}

impl core::fmt::Display for TimepointKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

/// A recurring weekly watering slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterTimepoint {
    pub days: WeekdaySet,
    /// Hour of day, 0-23.
    pub hour: u8,
    /// Minute of hour, 0-59.
    pub minute: u8,
    pub kind: TimepointKind,
    /// How long the valve stays open.
    pub duration_secs: u32,
}

/// One irrigation zone driven by a single relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Valve {
    pub id: String,
    pub name: String,
    /// GPIO number of the relay input.
    pub pin: i32,
    /// Relay closes on a low level.
    #[serde(default)]
    pub active_low: bool,
    #[serde(default)]
    pub timepoints: Vec<WaterTimepoint>,
}

// ═══════════════════════════════════════════════════════════════
//  Matching
// ═══════════════════════════════════════════════════════════════

/// Return the first timepoint of `valve` that fires at `instant`.
///
/// `instant` is interpreted in its own time zone; the device clock hands in
/// local time.  Seconds are ignored.
pub fn match_timepoint<'a, Tz: TimeZone>(
    valve: &'a Valve,
    instant: &DateTime<Tz>,
) -> Option<&'a WaterTimepoint> {
    let weekday = instant.weekday().num_days_from_sunday() as u8;
    let hour = instant.hour() as u8;
    let minute = instant.minute() as u8;

    valve
        .timepoints
        .iter()
        .find(|tp| tp.hour == hour && tp.minute == minute && tp.days.contains(weekday))
}

/// Calendar minute of a local instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MinuteStamp {
    pub date: NaiveDate,
    pub hour: u8,
    pub minute: u8,
}

impl MinuteStamp {
    pub fn of<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self {
        Self {
            date: instant.date_naive(),
            hour: instant.hour() as u8,
            minute: instant.minute() as u8,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
