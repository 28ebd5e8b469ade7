//! Difference and accumulation helpers.
//!
//! Building blocks for the oscillator family (gain/loss feed RSI and CMO)
//! and directly addressable through the registry's `helpers:` keys.

use std::sync::Arc;

use crate::domain::BarSeries;
use crate::indicators::{Indicator, Memo};

/// Upward change of the source since the previous index, floored at zero.
/// Index 0 has no predecessor and yields 0.
#[derive(Debug)]
pub struct Gain {
    source: Arc<dyn Indicator>,
}

impl Gain {
    pub fn new(source: Arc<dyn Indicator>) -> Self {
        Self { source }
    }
}

impl Indicator for Gain {
    fn value_at(&self, index: usize) -> f64 {
        if index == 0 {
            return 0.0;
        }
        (self.source.value_at(index) - self.source.value_at(index - 1)).max(0.0)
    }

    fn unstable_bars(&self) -> usize {
        1
    }
}

/// Downward change of the source since the previous index, floored at zero.
/// Index 0 has no predecessor and yields 0.
#[derive(Debug)]
pub struct Loss {
    source: Arc<dyn Indicator>,
}

impl Loss {
    pub fn new(source: Arc<dyn Indicator>) -> Self {
        Self { source }
    }
}

impl Indicator for Loss {
    fn value_at(&self, index: usize) -> f64 {
        if index == 0 {
            return 0.0;
        }
        (self.source.value_at(index - 1) - self.source.value_at(index)).max(0.0)
    }

    fn unstable_bars(&self) -> usize {
        1
    }
}

/// Signed close-to-close change: close[i] - close[i-1], 0 at index 0.
#[derive(Debug)]
pub struct ClosePriceDifference {
    series: Arc<BarSeries>,
}

impl ClosePriceDifference {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self { series }
    }
}

impl Indicator for ClosePriceDifference {
    fn value_at(&self, index: usize) -> f64 {
        if index == 0 {
            return 0.0;
        }
        let bars = self.series.bars();
        bars[index].close - bars[index - 1].close
    }

    fn unstable_bars(&self) -> usize {
        1
    }
}

/// Source value `n` indices back; NaN while no such index exists.
#[derive(Debug)]
pub struct PreviousValue {
    source: Arc<dyn Indicator>,
    n: usize,
}

impl PreviousValue {
    pub fn new(source: Arc<dyn Indicator>, n: usize) -> Self {
        assert!(n >= 1, "previous-value distance must be >= 1");
        Self { source, n }
    }
}

impl Indicator for PreviousValue {
    fn value_at(&self, index: usize) -> f64 {
        match index.checked_sub(self.n) {
            Some(previous) => self.source.value_at(previous),
            None => f64::NAN,
        }
    }

    fn unstable_bars(&self) -> usize {
        self.n
    }
}

/// Sum of the source over the trailing window (partial at the start).
#[derive(Debug)]
pub struct RunningTotal {
    source: Arc<dyn Indicator>,
    period: usize,
    memo: Memo,
}

impl RunningTotal {
    pub fn new(source: Arc<dyn Indicator>, period: usize) -> Self {
        assert!(period >= 1, "running-total period must be >= 1");
        Self {
            source,
            period,
            memo: Memo::new(),
        }
    }
}

impl Indicator for RunningTotal {
    fn value_at(&self, index: usize) -> f64 {
        self.memo.get_or_compute(index, || {
            let start = (index + 1).saturating_sub(self.period);
            (start..=index).map(|i| self.source.value_at(i)).sum()
        })
    }

    fn unstable_bars(&self) -> usize {
        self.period.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::price::ClosePrice;
    use crate::indicators::{assert_approx, make_series, DEFAULT_EPSILON};

    fn close_source(closes: &[f64]) -> Arc<dyn Indicator> {
        Arc::new(ClosePrice::new(make_series(closes)))
    }

    #[test]
    fn gain_floors_drops_at_zero() {
        let gain = Gain::new(close_source(&[10.0, 12.0, 11.0, 11.0]));
        assert_approx(gain.value_at(0), 0.0, DEFAULT_EPSILON);
        assert_approx(gain.value_at(1), 2.0, DEFAULT_EPSILON);
        assert_approx(gain.value_at(2), 0.0, DEFAULT_EPSILON);
        assert_approx(gain.value_at(3), 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn loss_floors_rises_at_zero() {
        let loss = Loss::new(close_source(&[10.0, 12.0, 11.0, 11.0]));
        assert_approx(loss.value_at(0), 0.0, DEFAULT_EPSILON);
        assert_approx(loss.value_at(1), 0.0, DEFAULT_EPSILON);
        assert_approx(loss.value_at(2), 1.0, DEFAULT_EPSILON);
        assert_approx(loss.value_at(3), 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn close_price_difference_is_signed() {
        let diff = ClosePriceDifference::new(make_series(&[10.0, 12.0, 11.0]));
        assert_approx(diff.value_at(0), 0.0, DEFAULT_EPSILON);
        assert_approx(diff.value_at(1), 2.0, DEFAULT_EPSILON);
        assert_approx(diff.value_at(2), -1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn previous_value_nan_before_lookback() {
        let prev = PreviousValue::new(close_source(&[10.0, 11.0, 12.0, 13.0]), 2);
        assert!(prev.value_at(0).is_nan());
        assert!(prev.value_at(1).is_nan());
        assert_approx(prev.value_at(2), 10.0, DEFAULT_EPSILON);
        assert_approx(prev.value_at(3), 11.0, DEFAULT_EPSILON);
        assert_eq!(prev.unstable_bars(), 2);
    }

    #[test]
    fn running_total_sums_trailing_window() {
        let total = RunningTotal::new(close_source(&[1.0, 2.0, 3.0, 4.0]), 3);
        assert_approx(total.value_at(0), 1.0, DEFAULT_EPSILON);
        assert_approx(total.value_at(1), 3.0, DEFAULT_EPSILON);
        assert_approx(total.value_at(2), 6.0, DEFAULT_EPSILON);
        assert_approx(total.value_at(3), 9.0, DEFAULT_EPSILON);
    }
}
