//! Outbound application events.
//!
//! The [`Controller`](super::controller::Controller) hands these to the
//! [`EventRecorder`](super::ports::EventRecorder) port and returns a
//! [`TickReport`] summarising what happened during the tick.

use chrono::{DateTime, FixedOffset};

use crate::decision::Reason;
use crate::error::Error;
use crate::schedule::TimepointKind;
use crate::weather::WeatherSnapshot;

/// A valve was watered.
#[derive(Debug, Clone, PartialEq)]
pub struct WateringEvent<'a> {
    pub valve_id: &'a str,
    pub valve_name: &'a str,
    pub kind: TimepointKind,
    pub duration_secs: u32,
    /// Weather the decision was based on; `None` when disabled/unavailable.
    pub weather: Option<&'a WeatherSnapshot>,
    /// Local time of the tick, with its UTC offset.
    pub at: DateTime<FixedOffset>,
}

/// What happened to one matched valve.
#[derive(Debug, Clone, PartialEq)]
pub enum ValveOutcome {
    Watered { duration_secs: u32, reason: Reason },
    Skipped { reason: Reason },
    Failed(Error),
}

/// Per-valve entry in a [`TickReport`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValveReport {
    pub valve_id: String,
    pub kind: TimepointKind,
    pub outcome: ValveOutcome,
}

/// Summary of one control-loop tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickReport {
    /// Only valves whose schedule matched appear here.
    pub valves: Vec<ValveReport>,
    /// The minute was already dispatched; nothing was evaluated.
    pub suppressed: bool,
    /// A weather fetch was attempted this tick.
    pub weather_fetched: bool,
}

impl TickReport {
    pub fn watered(&self) -> impl Iterator<Item = &ValveReport> {
        self.valves
            .iter()
            .filter(|v| matches!(v.outcome, ValveOutcome::Watered { .. }))
    }
}
