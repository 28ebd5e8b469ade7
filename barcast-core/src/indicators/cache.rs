//! Per-pass indicator cache.
//!
//! Scoped to a single evaluation pass over one series (one page in streaming
//! mode). Longer-lived reuse across requests goes through the session cache,
//! which layers on top of this keying scheme.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::BarSeries;
use crate::indicators::{registry, Indicator};

/// Which side of a condition an indicator serves.
///
/// Cached instances are role-scoped: the same name and period requested for
/// the main side and the comparison side never alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Main,
    Other,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Main => "main",
            Role::Other => "other",
        }
    }
}

/// Indicator instances for one series, keyed by (lowercased name, period,
/// role).
#[derive(Debug)]
pub struct IndicatorCache {
    series: Arc<BarSeries>,
    entries: HashMap<(String, i32, Role), Arc<dyn Indicator>>,
}

impl IndicatorCache {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self {
            series,
            entries: HashMap::new(),
        }
    }

    pub fn series(&self) -> &Arc<BarSeries> {
        &self.series
    }

    /// Fetch the cached instance for this key, constructing through the
    /// registry on first use.
    pub fn get_or_create(&mut self, name: &str, period: i32, role: Role) -> Arc<dyn Indicator> {
        let key = (name.trim().to_lowercase(), period, role);
        self.entries
            .entry(key)
            .or_insert_with(|| registry::create(&self.series, name, period))
            .clone()
    }

    /// Install an already-built instance under this key, replacing any
    /// existing one. Used to seed a pass-local cache from longer-lived
    /// storage.
    pub fn insert(&mut self, name: &str, period: i32, role: Role, indicator: Arc<dyn Indicator>) {
        self.entries
            .insert((name.trim().to_lowercase(), period, role), indicator);
    }

    /// Iterate every cached instance with its key components.
    pub fn entries(&self) -> impl Iterator<Item = (&str, i32, Role, &Arc<dyn Indicator>)> {
        self.entries
            .iter()
            .map(|((name, period, role), indicator)| (name.as_str(), *period, *role, indicator))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
