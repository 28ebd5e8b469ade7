//! Candlestick measures and patterns.
//!
//! Pattern indicators (doji, engulfing) are 1.0 / 0.0 valued so they plug
//! into the same numeric comparison pipeline as every other indicator.

use std::sync::Arc;

use crate::domain::BarSeries;
use crate::indicators::average::Sma;
use crate::indicators::Indicator;

/// Signed candle body: close - open.
#[derive(Debug)]
pub struct RealBody {
    series: Arc<BarSeries>,
}

impl RealBody {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self { series }
    }
}

impl Indicator for RealBody {
    fn value_at(&self, index: usize) -> f64 {
        let bar = &self.series.bars()[index];
        bar.close - bar.open
    }

    fn unstable_bars(&self) -> usize {
        0
    }
}

/// Upper wick: high minus the body top.
#[derive(Debug)]
pub struct UpperShadow {
    series: Arc<BarSeries>,
}

impl UpperShadow {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self { series }
    }
}

impl Indicator for UpperShadow {
    fn value_at(&self, index: usize) -> f64 {
        let bar = &self.series.bars()[index];
        bar.high - bar.open.max(bar.close)
    }

    fn unstable_bars(&self) -> usize {
        0
    }
}

/// Lower wick: body bottom minus low.
#[derive(Debug)]
pub struct LowerShadow {
    series: Arc<BarSeries>,
}

impl LowerShadow {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self { series }
    }
}

impl Indicator for LowerShadow {
    fn value_at(&self, index: usize) -> f64 {
        let bar = &self.series.bars()[index];
        bar.open.min(bar.close) - bar.low
    }

    fn unstable_bars(&self) -> usize {
        0
    }
}

/// Absolute candle body, the doji's comparison base.
#[derive(Debug)]
struct BodyHeight {
    series: Arc<BarSeries>,
}

impl Indicator for BodyHeight {
    fn value_at(&self, index: usize) -> f64 {
        let bar = &self.series.bars()[index];
        (bar.close - bar.open).abs()
    }

    fn unstable_bars(&self) -> usize {
        0
    }
}

/// Doji: the body is tiny compared to the average body of the preceding
/// window (strictly less than `body_factor` times the prior SMA). Index 0
/// is a doji only for a zero body.
#[derive(Debug)]
pub struct Doji {
    body: Arc<dyn Indicator>,
    average_body: Sma,
    body_factor: f64,
}

impl Doji {
    pub fn new(series: Arc<BarSeries>, period: usize, body_factor: f64) -> Self {
        assert!(period >= 1, "doji averaging period must be >= 1");
        let body: Arc<dyn Indicator> = Arc::new(BodyHeight { series });
        Self {
            average_body: Sma::new(body.clone(), period),
            body,
            body_factor,
        }
    }
}

impl Indicator for Doji {
    fn value_at(&self, index: usize) -> f64 {
        if index == 0 {
            return if self.body.value_at(0) == 0.0 { 1.0 } else { 0.0 };
        }
        let current = self.body.value_at(index);
        let average = self.average_body.value_at(index - 1);
        if current < average * self.body_factor {
            1.0
        } else {
            0.0
        }
    }

    fn unstable_bars(&self) -> usize {
        1
    }
}

/// Bullish engulfing: a bullish candle whose body fully wraps the previous
/// bearish candle's body.
#[derive(Debug)]
pub struct BullishEngulfing {
    series: Arc<BarSeries>,
}

impl BullishEngulfing {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self { series }
    }
}

impl Indicator for BullishEngulfing {
    fn value_at(&self, index: usize) -> f64 {
        if index == 0 {
            return 0.0;
        }
        let bars = self.series.bars();
        let prev = &bars[index - 1];
        let curr = &bars[index];
        let engulfing = prev.is_bearish()
            && curr.is_bullish()
            && curr.open < prev.open
            && curr.open < prev.close
            && curr.close > prev.open
            && curr.close > prev.close;
        if engulfing {
            1.0
        } else {
            0.0
        }
    }

    fn unstable_bars(&self) -> usize {
        1
    }
}

/// Bearish engulfing: a bearish candle whose body fully wraps the previous
/// bullish candle's body.
#[derive(Debug)]
pub struct BearishEngulfing {
    series: Arc<BarSeries>,
}

impl BearishEngulfing {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self { series }
    }
}

impl Indicator for BearishEngulfing {
    fn value_at(&self, index: usize) -> f64 {
        if index == 0 {
            return 0.0;
        }
        let bars = self.series.bars();
        let prev = &bars[index - 1];
        let curr = &bars[index];
        let engulfing = prev.is_bullish()
            && curr.is_bearish()
            && curr.open > prev.open
            && curr.open > prev.close
            && curr.close < prev.open
            && curr.close < prev.close;
        if engulfing {
            1.0
        } else {
            0.0
        }
    }

    fn unstable_bars(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, BarSeries};
    use crate::indicators::{assert_approx, make_series, DEFAULT_EPSILON};

    /// Build a series from (open, close) pairs; high/low bracket the body.
    fn series_from_pairs(pairs: &[(f64, f64)]) -> Arc<BarSeries> {
        let base = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        let mut series = BarSeries::new("candles");
        for (i, &(open, close)) in pairs.iter().enumerate() {
            series.push(Bar {
                date: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            });
        }
        Arc::new(series)
    }

    #[test]
    fn body_and_shadows() {
        // Bar 1: open 10, high 13, low 9, close 12.
        let series = make_series(&[10.0, 12.0]);
        assert_approx(RealBody::new(series.clone()).value_at(1), 2.0, DEFAULT_EPSILON);
        assert_approx(UpperShadow::new(series.clone()).value_at(1), 1.0, DEFAULT_EPSILON);
        assert_approx(LowerShadow::new(series).value_at(1), 1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn doji_compares_body_to_prior_average() {
        let series = series_from_pairs(&[(10.0, 14.0), (14.0, 14.05), (14.05, 15.05)]);
        let doji = Doji::new(series, 3, 0.03);
        // Index 0 has a 4.0 body, not a doji.
        assert_approx(doji.value_at(0), 0.0, DEFAULT_EPSILON);
        // Prior average body 4.0, threshold 0.12, body 0.05.
        assert_approx(doji.value_at(1), 1.0, DEFAULT_EPSILON);
        // Body 1.0 exceeds the threshold.
        assert_approx(doji.value_at(2), 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn doji_zero_body_at_index_zero() {
        let series = series_from_pairs(&[(10.0, 10.0)]);
        assert_approx(Doji::new(series, 3, 0.03).value_at(0), 1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bullish_engulfing_wraps_previous_body() {
        let series = series_from_pairs(&[(12.0, 10.0), (9.0, 13.0)]);
        let pattern = BullishEngulfing::new(series);
        assert_approx(pattern.value_at(0), 0.0, DEFAULT_EPSILON);
        assert_approx(pattern.value_at(1), 1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bullish_engulfing_requires_full_wrap() {
        // Current opens inside the previous body: not engulfing.
        let series = series_from_pairs(&[(12.0, 10.0), (11.0, 13.0)]);
        assert_approx(BullishEngulfing::new(series).value_at(1), 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bearish_engulfing_mirrors_bullish() {
        let series = series_from_pairs(&[(10.0, 12.0), (13.0, 9.0)]);
        let pattern = BearishEngulfing::new(series);
        assert_approx(pattern.value_at(1), 1.0, DEFAULT_EPSILON);
    }
}
