//! Fuzz target: `EventLog` ring buffer
//!
//! Drives arbitrary append / corrupt / reopen / clear sequences against an
//! in-memory store and verifies:
//! - No panics when slots or the header hold garbage
//! - `read_all` never returns more than the ring holds
//! - `read_all` is ordered by sequence number
//! - After `clear`, nothing is left
//!
//! cargo fuzz run fuzz_event_log

#![no_main]

use std::collections::HashMap;

use irrigator::adapters::event_log::{EventLog, RecordBody};
use irrigator::app::ports::StoragePort;
use irrigator::error::StorageError;
use libfuzzer_sys::fuzz_target;

const MAX_RECORDS: usize = 16;

#[derive(Default)]
struct MemStore {
    data: HashMap<String, Vec<u8>>,
}

impl StoragePort for MemStore {
    fn read(&self, ns: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.data.get(&format!("{ns}::{key}")) {
            Some(v) => {
                let n = v.len().min(buf.len());
                buf[..n].copy_from_slice(&v[..n]);
                Ok(n)
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, ns: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.data.insert(format!("{ns}::{key}"), data.to_vec());
        Ok(())
    }

    fn exists(&self, ns: &str, key: &str) -> bool {
        self.data.contains_key(&format!("{ns}::{key}"))
    }

    fn delete(&mut self, ns: &str, key: &str) -> Result<(), StorageError> {
        self.data.remove(&format!("{ns}::{key}"));
        Ok(())
    }
}

fn message(bytes: &[u8]) -> heapless::String<96> {
    let mut s = heapless::String::new();
    for c in String::from_utf8_lossy(bytes).chars() {
        if s.push(c).is_err() {
            break;
        }
    }
    s
}

fuzz_target!(|data: &[u8]| {
    let mut log = EventLog::open(MemStore::default());

    for (i, chunk) in data.chunks(8).enumerate() {
        match chunk[0] % 4 {
            0 | 1 => {
                let body = RecordBody::Failure { message: message(&chunk[1..]) };
                log.append(i as i64, body).unwrap();
            }
            2 => {
                // Scribble over a slot or the header, then reopen.
                let mut store = log.into_storage();
                let key = match chunk.get(1) {
                    Some(b) if (*b as usize) < MAX_RECORDS => format!("e{b}"),
                    _ => "hdr".to_string(),
                };
                store.write("events", &key, &chunk[1..]).unwrap();
                log = EventLog::open(store);
            }
            _ => {
                let records = log.read_all();
                assert!(records.len() <= MAX_RECORDS);
                assert!(records.windows(2).all(|w| w[0].seq <= w[1].seq));
            }
        }
    }

    assert!(log.read_all().len() <= MAX_RECORDS);
    log.clear().unwrap();
    assert!(log.read_all().is_empty());
});
