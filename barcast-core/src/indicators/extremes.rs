//! Window extremes and the running maximum.

use std::sync::Arc;

use crate::indicators::{Indicator, Memo, RecursiveMemo};

/// Highest source value over the trailing window (partial at the start).
#[derive(Debug)]
pub struct HighestValue {
    source: Arc<dyn Indicator>,
    period: usize,
    memo: Memo,
}

impl HighestValue {
    pub fn new(source: Arc<dyn Indicator>, period: usize) -> Self {
        assert!(period >= 1, "highest-value period must be >= 1");
        Self {
            source,
            period,
            memo: Memo::new(),
        }
    }
}

impl Indicator for HighestValue {
    fn value_at(&self, index: usize) -> f64 {
        self.memo.get_or_compute(index, || {
            let start = (index + 1).saturating_sub(self.period);
            (start..=index)
                .map(|i| self.source.value_at(i))
                .fold(f64::NEG_INFINITY, f64::max)
        })
    }

    fn unstable_bars(&self) -> usize {
        self.period.saturating_sub(1)
    }
}

/// Lowest source value over the trailing window (partial at the start).
#[derive(Debug)]
pub struct LowestValue {
    source: Arc<dyn Indicator>,
    period: usize,
    memo: Memo,
}

impl LowestValue {
    pub fn new(source: Arc<dyn Indicator>, period: usize) -> Self {
        assert!(period >= 1, "lowest-value period must be >= 1");
        Self {
            source,
            period,
            memo: Memo::new(),
        }
    }
}

impl Indicator for LowestValue {
    fn value_at(&self, index: usize) -> f64 {
        self.memo.get_or_compute(index, || {
            let start = (index + 1).saturating_sub(self.period);
            (start..=index)
                .map(|i| self.source.value_at(i))
                .fold(f64::INFINITY, f64::min)
        })
    }

    fn unstable_bars(&self) -> usize {
        self.period.saturating_sub(1)
    }
}

/// Running maximum of the source from index 0 (the `maxh: maxh` entry,
/// conventionally over the high price). Ignores the period parameter.
#[derive(Debug)]
pub struct CumulativeMax {
    source: Arc<dyn Indicator>,
    memo: RecursiveMemo,
}

impl CumulativeMax {
    pub fn new(source: Arc<dyn Indicator>) -> Self {
        Self {
            source,
            memo: RecursiveMemo::new(),
        }
    }
}

impl Indicator for CumulativeMax {
    fn value_at(&self, index: usize) -> f64 {
        self.memo.get_or_fill(index, |prev, i| {
            let value = self.source.value_at(i);
            match prev {
                None => value,
                Some(prev) => prev.max(value),
            }
        })
    }

    fn unstable_bars(&self) -> usize {
        0
    }
}
