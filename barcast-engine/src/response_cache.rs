//! Bounded, fingerprint-keyed cache of assembled batch responses.
//!
//! A repeat of an identical request is served from memory instead of
//! re-evaluating every instrument. Entries expire after a fixed TTL;
//! beyond the capacity bound the least recently used entry is evicted.
//! Recomputing under an existing fingerprint overwrites the stored
//! response.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use barcast_core::fingerprint::Fingerprint;
use barcast_core::record::InstrumentResult;

struct CacheEntry {
    response: Arc<Vec<InstrumentResult>>,
    inserted_at: Instant,
    last_access: Instant,
}

/// In-memory response cache keyed by request fingerprint.
pub struct ResponseCache {
    entries: Mutex<HashMap<Fingerprint, CacheEntry>>,
    capacity: usize,
    ttl: Duration,
}

impl ResponseCache {
    /// Create a cache holding at most `capacity` responses for at most
    /// `ttl` each. A capacity of zero disables storage entirely.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
            ttl,
        }
    }

    /// The stored response for this fingerprint, bumping its recency.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<Vec<InstrumentResult>>> {
        let mut entries = self.entries.lock().unwrap();
        purge_expired(&mut entries, self.ttl);
        let entry = entries.get_mut(fingerprint)?;
        entry.last_access = Instant::now();
        Some(Arc::clone(&entry.response))
    }

    /// Store a response, evicting the least recently used entry if the
    /// cache is full. Returns the shared handle for the caller to serve.
    pub fn put(
        &self,
        fingerprint: Fingerprint,
        response: Vec<InstrumentResult>,
    ) -> Arc<Vec<InstrumentResult>> {
        let response = Arc::new(response);
        if self.capacity == 0 {
            return response;
        }

        let mut entries = self.entries.lock().unwrap();
        purge_expired(&mut entries, self.ttl);

        if !entries.contains_key(&fingerprint) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                entries.remove(&key);
            }
        }

        let now = Instant::now();
        entries.insert(
            fingerprint,
            CacheEntry {
                response: Arc::clone(&response),
                inserted_at: now,
                last_access: now,
            },
        );
        response
    }

    /// Drop every stored response.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

fn purge_expired(entries: &mut HashMap<Fingerprint, CacheEntry>, ttl: Duration) {
    entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
}
