//! Direct price and volume reads.
//!
//! Per-bar transforms with no lookback: each value is a function of the bar
//! at the requested index only. No memoization needed.

use std::sync::Arc;

use crate::domain::BarSeries;
use crate::indicators::Indicator;

/// Open price of the bar.
#[derive(Debug)]
pub struct OpenPrice {
    series: Arc<BarSeries>,
}

impl OpenPrice {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self { series }
    }
}

impl Indicator for OpenPrice {
    fn value_at(&self, index: usize) -> f64 {
        self.series.bars()[index].open
    }

    fn unstable_bars(&self) -> usize {
        0
    }
}

/// High price of the bar.
#[derive(Debug)]
pub struct HighPrice {
    series: Arc<BarSeries>,
}

impl HighPrice {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self { series }
    }
}

impl Indicator for HighPrice {
    fn value_at(&self, index: usize) -> f64 {
        self.series.bars()[index].high
    }

    fn unstable_bars(&self) -> usize {
        0
    }
}

/// Low price of the bar.
#[derive(Debug)]
pub struct LowPrice {
    series: Arc<BarSeries>,
}

impl LowPrice {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self { series }
    }
}

impl Indicator for LowPrice {
    fn value_at(&self, index: usize) -> f64 {
        self.series.bars()[index].low
    }

    fn unstable_bars(&self) -> usize {
        0
    }
}

/// Close price of the bar.
#[derive(Debug)]
pub struct ClosePrice {
    series: Arc<BarSeries>,
}

impl ClosePrice {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self { series }
    }
}

impl Indicator for ClosePrice {
    fn value_at(&self, index: usize) -> f64 {
        self.series.bars()[index].close
    }

    fn unstable_bars(&self) -> usize {
        0
    }
}

/// Traded volume of the bar, as f64.
#[derive(Debug)]
pub struct Volume {
    series: Arc<BarSeries>,
}

impl Volume {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self { series }
    }
}

impl Indicator for Volume {
    fn value_at(&self, index: usize) -> f64 {
        self.series.bars()[index].volume as f64
    }

    fn unstable_bars(&self) -> usize {
        0
    }
}

/// Typical price: (high + low + close) / 3.
#[derive(Debug)]
pub struct TypicalPrice {
    series: Arc<BarSeries>,
}

impl TypicalPrice {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self { series }
    }
}

impl Indicator for TypicalPrice {
    fn value_at(&self, index: usize) -> f64 {
        self.series.bars()[index].typical_price()
    }

    fn unstable_bars(&self) -> usize {
        0
    }
}

/// Median price: (high + low) / 2.
#[derive(Debug)]
pub struct MedianPrice {
    series: Arc<BarSeries>,
}

impl MedianPrice {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self { series }
    }
}

impl Indicator for MedianPrice {
    fn value_at(&self, index: usize) -> f64 {
        self.series.bars()[index].median_price()
    }

    fn unstable_bars(&self) -> usize {
        0
    }
}

/// Fixed value at every index.
///
/// The registry maps the period parameter to the constant, so
/// `"helpers: constant"` with period 5 evaluates to 5.0 everywhere.
#[derive(Debug)]
pub struct Constant {
    value: f64,
}

impl Constant {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Indicator for Constant {
    fn value_at(&self, _index: usize) -> f64 {
        self.value
    }

    fn unstable_bars(&self) -> usize {
        0
    }
}
