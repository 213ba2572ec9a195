//! In-memory record source.

use crate::loader::{Loader, LoaderError};
use crate::record::Record;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A loader over a replaceable in-memory record set.
///
/// Useful for embedding programmatic configuration and for driving the
/// live cache in tests: swap the records, or mark the source unavailable
/// to simulate an outage.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    records: RwLock<Vec<Record>>,
    outage: RwLock<Option<String>>,
    loads: AtomicUsize,
    closed: AtomicBool,
}

impl MemoryLoader {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: RwLock::new(records),
            ..Default::default()
        }
    }

    /// Replace the whole record set.
    pub fn set(&self, records: Vec<Record>) {
        *self.records.write() = records;
    }

    /// Apply an edit to the record set.
    pub fn update(&self, edit: impl FnOnce(&mut Vec<Record>)) {
        edit(&mut self.records.write());
    }

    /// Make every following load fail until [`recover`](Self::recover).
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.outage.write() = Some(reason.into());
    }

    pub fn recover(&self) {
        *self.outage.write() = None;
    }

    /// Number of load calls so far, failed ones included.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Loader for MemoryLoader {
    fn load(&self) -> Result<Vec<Record>, LoaderError> {
        self.loads.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = self.outage.read().clone() {
            return Err(LoaderError::Unavailable(reason));
        }

        let records = self.records.read().clone();
        tracing::trace!(size = records.len(), "Loaded in-memory records");
        Ok(records)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
