//! Moving averages over an arbitrary source indicator.
//!
//! All four accept short histories: inside the leading window the mean is
//! taken over however many values exist (indices 0..=i), so `value_at` is
//! total from index 0. Lookback for stability purposes: period - 1.

use std::sync::Arc;

use crate::indicators::{Indicator, Memo, RecursiveMemo};

/// Simple moving average: mean of the source over the trailing window.
#[derive(Debug)]
pub struct Sma {
    source: Arc<dyn Indicator>,
    period: usize,
    memo: Memo,
}

impl Sma {
    pub fn new(source: Arc<dyn Indicator>, period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            source,
            period,
            memo: Memo::new(),
        }
    }
}

impl Indicator for Sma {
    fn value_at(&self, index: usize) -> f64 {
        self.memo.get_or_compute(index, || {
            let start = (index + 1).saturating_sub(self.period);
            let mut sum = 0.0;
            for i in start..=index {
                sum += self.source.value_at(i);
            }
            sum / (index - start + 1) as f64
        })
    }

    fn unstable_bars(&self) -> usize {
        self.period.saturating_sub(1)
    }
}

/// Exponential moving average with multiplier 2 / (period + 1).
///
/// Seeded with the source value at index 0, then
/// `ema[i] = ema[i-1] + k * (source[i] - ema[i-1])`.
#[derive(Debug)]
pub struct Ema {
    source: Arc<dyn Indicator>,
    period: usize,
    memo: RecursiveMemo,
}

impl Ema {
    pub fn new(source: Arc<dyn Indicator>, period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            source,
            period,
            memo: RecursiveMemo::new(),
        }
    }
}

impl Indicator for Ema {
    fn value_at(&self, index: usize) -> f64 {
        let k = 2.0 / (self.period as f64 + 1.0);
        self.memo.get_or_fill(index, |prev, i| {
            let value = self.source.value_at(i);
            match prev {
                None => value,
                Some(prev) => prev + k * (value - prev),
            }
        })
    }

    fn unstable_bars(&self) -> usize {
        self.period.saturating_sub(1)
    }
}

/// Linearly weighted moving average: the most recent value carries the
/// largest weight (window size down to 1).
#[derive(Debug)]
pub struct Wma {
    source: Arc<dyn Indicator>,
    period: usize,
    memo: Memo,
}

impl Wma {
    pub fn new(source: Arc<dyn Indicator>, period: usize) -> Self {
        assert!(period >= 1, "WMA period must be >= 1");
        Self {
            source,
            period,
            memo: Memo::new(),
        }
    }
}

impl Indicator for Wma {
    fn value_at(&self, index: usize) -> f64 {
        self.memo.get_or_compute(index, || {
            let window = self.period.min(index + 1);
            let mut weighted = 0.0;
            for offset in 0..window {
                let weight = (window - offset) as f64;
                weighted += weight * self.source.value_at(index - offset);
            }
            let denominator = (window * (window + 1)) as f64 / 2.0;
            weighted / denominator
        })
    }

    fn unstable_bars(&self) -> usize {
        self.period.saturating_sub(1)
    }
}

/// Wilder's modified moving average: EMA with multiplier 1 / period.
#[derive(Debug)]
pub struct Mma {
    source: Arc<dyn Indicator>,
    period: usize,
    memo: RecursiveMemo,
}

impl Mma {
    pub fn new(source: Arc<dyn Indicator>, period: usize) -> Self {
        assert!(period >= 1, "MMA period must be >= 1");
        Self {
            source,
            period,
            memo: RecursiveMemo::new(),
        }
    }
}

impl Indicator for Mma {
    fn value_at(&self, index: usize) -> f64 {
        let k = 1.0 / self.period as f64;
        self.memo.get_or_fill(index, |prev, i| {
            let value = self.source.value_at(i);
            match prev {
                None => value,
                Some(prev) => prev + k * (value - prev),
            }
        })
    }

    fn unstable_bars(&self) -> usize {
        self.period.saturating_sub(1)
    }
}
