//! Cross-request session caches for series and indicator instances.
//!
//! Histories and warmed indicator state survive between requests so a repeat
//! evaluation over the same instrument skips both the store load and the
//! indicator warm-up scan. Both maps are process-wide and shared by every
//! worker; readers take the read lock, installs race under the write lock
//! and the first writer wins, so concurrent evaluations of the same
//! instrument converge on one shared instance.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use barcast_core::domain::{BarSeries, InstrumentId};
use barcast_core::indicators::{Indicator, IndicatorCache, Role};

use crate::store::{BarStore, StoreError};

type IndicatorEntry = (String, i32, Role, Arc<dyn Indicator>);

/// Session-scoped cache of loaded series and warmed indicator instances.
///
/// Indicator keys are `{id}|{name}|{period}|{role}`, with the name already
/// trimmed and lowercased by the per-evaluation cache, so seeding and
/// absorbing always agree on the key.
#[derive(Default)]
pub struct SessionCache {
    series: RwLock<HashMap<InstrumentId, Arc<BarSeries>>>,
    indicators: RwLock<HashMap<String, IndicatorEntry>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached series for an instrument, loading from the store on a
    /// miss.
    ///
    /// The store load runs outside the lock; if two workers race, the first
    /// install wins and the loser's load is dropped.
    pub fn get_or_create_series(
        &self,
        id: InstrumentId,
        store: &dyn BarStore,
    ) -> Result<Arc<BarSeries>, StoreError> {
        if let Some(series) = self.series.read().unwrap().get(&id) {
            return Ok(Arc::clone(series));
        }

        let rows = store.load_full_history(id)?;
        tracing::debug!("loaded full history for instrument {id}: {} row(s)", rows.len());
        let loaded = Arc::new(BarSeries::from_records(format!("idnectum_{id}"), rows));

        let mut guard = self.series.write().unwrap();
        Ok(Arc::clone(guard.entry(id).or_insert(loaded)))
    }

    /// Copy this instrument's cached indicator instances into a fresh
    /// per-evaluation cache.
    pub fn seed_indicator_cache(&self, id: InstrumentId, cache: &mut IndicatorCache) {
        let prefix = format!("{id}|");
        let guard = self.indicators.read().unwrap();
        for (key, (name, period, role, indicator)) in guard.iter() {
            if key.starts_with(&prefix) {
                cache.insert(name, *period, *role, Arc::clone(indicator));
            }
        }
    }

    /// Publish the instances a finished evaluation created. Existing entries
    /// are kept, so the first evaluation to finish wins a race.
    pub fn absorb_indicators(&self, id: InstrumentId, cache: &IndicatorCache) {
        let mut guard = self.indicators.write().unwrap();
        for (name, period, role, indicator) in cache.entries() {
            let key = indicator_key(id, name, period, role);
            guard
                .entry(key)
                .or_insert_with(|| (name.to_string(), period, role, Arc::clone(indicator)));
        }
    }

    /// Drop the cached series and every indicator instance for one
    /// instrument.
    pub fn evict(&self, id: InstrumentId) {
        self.series.write().unwrap().remove(&id);
        let prefix = format!("{id}|");
        self.indicators
            .write()
            .unwrap()
            .retain(|key, _| !key.starts_with(&prefix));
    }

    /// Drop everything.
    pub fn evict_all(&self) {
        self.series.write().unwrap().clear();
        self.indicators.write().unwrap().clear();
    }

    pub fn series_count(&self) -> usize {
        self.series.read().unwrap().len()
    }

    pub fn indicator_count(&self) -> usize {
        self.indicators.read().unwrap().len()
    }
}

fn indicator_key(id: InstrumentId, name: &str, period: i32, role: Role) -> String {
    format!("{id}|{name}|{period}|{}", role.as_str())
}
