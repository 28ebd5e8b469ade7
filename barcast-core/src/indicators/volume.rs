//! Volume-weighted and volume-flow indicators.

use std::sync::Arc;

use crate::domain::BarSeries;
use crate::indicators::{Indicator, Memo, RecursiveMemo};

/// On-balance volume: running volume total signed by the close-to-close
/// direction. Starts at 0.
#[derive(Debug)]
pub struct Obv {
    series: Arc<BarSeries>,
    memo: RecursiveMemo,
}

impl Obv {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self {
            series,
            memo: RecursiveMemo::new(),
        }
    }
}

impl Indicator for Obv {
    fn value_at(&self, index: usize) -> f64 {
        self.memo.get_or_fill(index, |prev, i| {
            let prev = match prev {
                None => return 0.0,
                Some(prev) => prev,
            };
            let bars = self.series.bars();
            let close = bars[i].close;
            let prev_close = bars[i - 1].close;
            let volume = bars[i].volume as f64;
            if close > prev_close {
                prev + volume
            } else if close < prev_close {
                prev - volume
            } else {
                prev
            }
        })
    }

    fn unstable_bars(&self) -> usize {
        1
    }
}

/// Volume-weighted average price over the trailing window.
#[derive(Debug)]
pub struct Vwap {
    series: Arc<BarSeries>,
    period: usize,
    memo: Memo,
}

impl Vwap {
    pub fn new(series: Arc<BarSeries>, period: usize) -> Self {
        assert!(period >= 1, "VWAP period must be >= 1");
        Self {
            series,
            period,
            memo: Memo::new(),
        }
    }
}

impl Indicator for Vwap {
    fn value_at(&self, index: usize) -> f64 {
        self.memo.get_or_compute(index, || {
            let bars = self.series.bars();
            if index == 0 {
                return bars[0].typical_price();
            }
            let start = (index + 1).saturating_sub(self.period);
            let mut weighted = 0.0;
            let mut total_volume = 0.0;
            for bar in &bars[start..=index] {
                let volume = bar.volume as f64;
                weighted += bar.typical_price() * volume;
                total_volume += volume;
            }
            weighted / total_volume
        })
    }

    fn unstable_bars(&self) -> usize {
        self.period.saturating_sub(1)
    }
}

/// Money flow index: RSI-style ratio of positive to negative typical-price
/// money flow over the trailing window.
#[derive(Debug)]
pub struct Mfi {
    series: Arc<BarSeries>,
    period: usize,
    memo: Memo,
}

impl Mfi {
    pub fn new(series: Arc<BarSeries>, period: usize) -> Self {
        assert!(period >= 1, "MFI period must be >= 1");
        Self {
            series,
            period,
            memo: Memo::new(),
        }
    }
}

impl Indicator for Mfi {
    fn value_at(&self, index: usize) -> f64 {
        self.memo.get_or_compute(index, || {
            let bars = self.series.bars();
            let start = (index + 1).saturating_sub(self.period);
            let mut positive = 0.0;
            let mut negative = 0.0;
            for i in start.max(1)..=index {
                let typical = bars[i].typical_price();
                let prev_typical = bars[i - 1].typical_price();
                let flow = typical * bars[i].volume as f64;
                if typical > prev_typical {
                    positive += flow;
                } else if typical < prev_typical {
                    negative += flow;
                }
            }
            if negative == 0.0 {
                return if positive == 0.0 { 0.0 } else { 100.0 };
            }
            100.0 - 100.0 / (1.0 + positive / negative)
        })
    }

    fn unstable_bars(&self) -> usize {
        self.period
    }
}

/// Accumulation/distribution line: cumulative close-location money flow.
/// Starts at 0.
#[derive(Debug)]
pub struct AccumulationDistribution {
    series: Arc<BarSeries>,
    memo: RecursiveMemo,
}

impl AccumulationDistribution {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self {
            series,
            memo: RecursiveMemo::new(),
        }
    }
}

impl Indicator for AccumulationDistribution {
    fn value_at(&self, index: usize) -> f64 {
        self.memo.get_or_fill(index, |prev, i| {
            let prev = match prev {
                None => return 0.0,
                Some(prev) => prev,
            };
            let bar = &self.series.bars()[i];
            let multiplier = ((bar.close - bar.low) - (bar.high - bar.close)) / (bar.high - bar.low);
            prev + multiplier * bar.volume as f64
        })
    }

    fn unstable_bars(&self) -> usize {
        1
    }
}
