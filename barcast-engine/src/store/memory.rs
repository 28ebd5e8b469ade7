//! In-memory store for tests and fixtures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;

use barcast_core::domain::{InstrumentId, StoreRecord};

use super::{slice_page, BarStore, StoreError, StorePage};

/// Map-backed store with load counters.
///
/// The counters make cache behavior observable: a session-cache hit performs
/// no store load, so `full_loads()` stays flat; an eviction forces a reload
/// and bumps it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    instruments: HashMap<InstrumentId, Vec<StoreRecord>>,
    full_loads: AtomicU64,
    page_loads: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one instrument's rows (ordered by date ascending).
    pub fn with_instrument(mut self, id: InstrumentId, records: Vec<StoreRecord>) -> Self {
        self.instruments.insert(id, records);
        self
    }

    pub fn insert(&mut self, id: InstrumentId, records: Vec<StoreRecord>) {
        self.instruments.insert(id, records);
    }

    pub fn full_loads(&self) -> u64 {
        self.full_loads.load(Ordering::Relaxed)
    }

    pub fn page_loads(&self) -> u64 {
        self.page_loads.load(Ordering::Relaxed)
    }

    fn rows(&self, id: InstrumentId) -> Result<&Vec<StoreRecord>, StoreError> {
        self.instruments.get(&id).ok_or(StoreError::NotFound(id))
    }
}

impl BarStore for MemoryStore {
    fn exists(&self, id: InstrumentId) -> bool {
        self.instruments.contains_key(&id)
    }

    fn load_full_history(&self, id: InstrumentId) -> Result<Vec<StoreRecord>, StoreError> {
        self.full_loads.fetch_add(1, Ordering::Relaxed);
        Ok(self.rows(id)?.clone())
    }

    fn load_page(
        &self,
        id: InstrumentId,
        start: NaiveDate,
        page: usize,
        page_size: usize,
    ) -> Result<StorePage, StoreError> {
        self.page_loads.fetch_add(1, Ordering::Relaxed);
        let rows = self.rows(id)?;
        let from = rows.partition_point(|r| r.date < start);
        Ok(slice_page(&rows[from..], page, page_size))
    }
}
