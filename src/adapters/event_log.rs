//! Persistent event log.
//!
//! Keeps the last 16 watering events and failures in an NVS ring buffer
//! under the "events" namespace, so the history survives a reboot.  Each
//! slot holds one postcard-encoded [`EventRecord`]; a small header key
//! tracks the next slot and the running sequence number.
//!
//! ```text
//!   slot:  e0  e1  e2 ... e15      hdr = (next_slot, next_seq)
//!           ▲           │
//!           └── wraps ──┘
//! ```

use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::app::events::WateringEvent;
use crate::app::ports::{EventRecorder, StoragePort};
use crate::error::{Error, RecorderError, StorageError};
use crate::schedule::TimepointKind;

const RING_SLOTS: usize = 16;
const NAMESPACE: &str = "events";
const HEADER_KEY: &str = "hdr";
const SLOT_BUF: usize = 192;

/// What a ring slot holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordBody {
    Watered {
        valve_id: heapless::String<24>,
        kind: TimepointKind,
        duration_secs: u32,
        /// Present when the decision used weather data.
        temperature_f: Option<f32>,
        past_precipitation_mm: Option<f32>,
    },
    Failure {
        message: heapless::String<96>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic across reboots.
    pub seq: u32,
    /// Unix seconds.
    pub at: i64,
    pub body: RecordBody,
}

/// Copy `s` into a fixed-capacity string, cutting at a char boundary.
fn truncated<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// NVS-backed ring buffer of [`EventRecord`]s.
pub struct EventLog<S> {
    storage: S,
    next_slot: usize,
    next_seq: u32,
}

impl<S: StoragePort> EventLog<S> {
    /// Take ownership of `storage` and resume from the stored header.
    ///
    /// A missing or unreadable header is rebuilt from the slot holding the
    /// highest sequence number, so new records never overwrite the newest.
    pub fn open(storage: S) -> Self {
        let mut log = Self {
            storage,
            next_slot: 0,
            next_seq: 0,
        };
        let mut buf = [0u8; 16];
        let header = match log.storage.read(NAMESPACE, HEADER_KEY, &mut buf) {
            Ok(len) => postcard::from_bytes::<(u32, u32)>(&buf[..len]).map_err(|_| {
                warn!("EventLog: header corrupt, rebuilding from slots");
            }),
            Err(StorageError::NotFound) => Err(()),
            Err(e) => {
                warn!("EventLog: header unreadable ({}), rebuilding from slots", e);
                Err(())
            }
        };
        match header {
            Ok((slot, seq)) => {
                log.next_slot = slot as usize % RING_SLOTS;
                log.next_seq = seq;
            }
            Err(()) => {
                if let Some((slot, newest)) = (0..RING_SLOTS)
                    .filter_map(|i| log.read_slot(i).map(|r| (i, r.seq)))
                    .max_by_key(|(_, seq)| *seq)
                {
                    log.next_slot = (slot + 1) % RING_SLOTS;
                    log.next_seq = newest.wrapping_add(1);
                }
            }
        }
        debug!("EventLog: resuming at slot {} seq {}", log.next_slot, log.next_seq);
        log
    }

    /// Append a record to the next ring slot and advance the header.
    pub fn append(&mut self, at: i64, body: RecordBody) -> Result<(), RecorderError> {
        let record = EventRecord {
            seq: self.next_seq,
            at,
            body,
        };
        let bytes = postcard::to_allocvec(&record).map_err(|_| RecorderError::Encode)?;
        self.storage
            .write(NAMESPACE, &Self::slot_key(self.next_slot), &bytes)?;

        self.next_slot = (self.next_slot + 1) % RING_SLOTS;
        self.next_seq = self.next_seq.wrapping_add(1);
        let header = postcard::to_allocvec(&(self.next_slot as u32, self.next_seq))
            .map_err(|_| RecorderError::Encode)?;
        self.storage.write(NAMESPACE, HEADER_KEY, &header)?;
        Ok(())
    }

    /// All readable records, oldest first.
    pub fn read_all(&self) -> Vec<EventRecord> {
        let mut records: Vec<EventRecord> = (0..RING_SLOTS).filter_map(|i| self.read_slot(i)).collect();
        records.sort_by_key(|r| r.seq);
        records
    }

    fn read_slot(&self, index: usize) -> Option<EventRecord> {
        let mut buf = [0u8; SLOT_BUF];
        let len = self
            .storage
            .read(NAMESPACE, &Self::slot_key(index), &mut buf)
            .ok()?;
        postcard::from_bytes(&buf[..len]).ok()
    }

    /// Erase every slot and reset the header.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        for i in 0..RING_SLOTS {
            self.storage.delete(NAMESPACE, &Self::slot_key(i))?;
        }
        self.storage.delete(NAMESPACE, HEADER_KEY)?;
        self.next_slot = 0;
        self.next_seq = 0;
        Ok(())
    }

    pub fn count(&self) -> usize {
        (0..RING_SLOTS)
            .filter(|i| self.storage.exists(NAMESPACE, &Self::slot_key(*i)))
            .count()
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    fn slot_key(index: usize) -> heapless::String<16> {
        let mut s = heapless::String::new();
        let _ = core::fmt::Write::write_fmt(&mut s, format_args!("e{}", index));
        s
    }
}

impl<S: StoragePort> EventRecorder for EventLog<S> {
    fn record_event(&mut self, event: &WateringEvent<'_>) -> Result<(), RecorderError> {
        self.append(
            event.at.timestamp(),
            RecordBody::Watered {
                valve_id: truncated(event.valve_id),
                kind: event.kind,
                duration_secs: event.duration_secs,
                temperature_f: event.weather.map(|w| w.current.temperature_f as f32),
                past_precipitation_mm: event.weather.map(|w| w.past_precipitation_mm as f32),
            },
        )
    }

    fn record_error(&mut self, error: &Error) -> Result<(), RecorderError> {
        self.append(
            Utc::now().timestamp(),
            RecordBody::Failure {
                message: truncated(&error.to_string()),
            },
        )
    }
}
