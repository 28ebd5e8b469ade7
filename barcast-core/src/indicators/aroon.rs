//! Aroon up/down/oscillator.
//!
//! Aroon up = 100 * (period - bars since the highest high) / period, over a
//! window of period + 1 bars; down mirrors with the lowest low. Ties resolve
//! to the most recent bar.

use std::sync::Arc;

use crate::domain::BarSeries;
use crate::indicators::{Indicator, Memo};

/// Which Aroon line to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AroonBand {
    Up,
    Down,
    Oscillator,
}

#[derive(Debug)]
pub struct Aroon {
    series: Arc<BarSeries>,
    period: usize,
    band: AroonBand,
    memo: Memo,
}

impl Aroon {
    pub fn new(series: Arc<BarSeries>, period: usize, band: AroonBand) -> Self {
        assert!(period >= 1, "Aroon period must be >= 1");
        Self {
            series,
            period,
            band,
            memo: Memo::new(),
        }
    }

    pub fn up(series: Arc<BarSeries>, period: usize) -> Self {
        Self::new(series, period, AroonBand::Up)
    }

    pub fn down(series: Arc<BarSeries>, period: usize) -> Self {
        Self::new(series, period, AroonBand::Down)
    }

    pub fn oscillator(series: Arc<BarSeries>, period: usize) -> Self {
        Self::new(series, period, AroonBand::Oscillator)
    }

    fn up_at(&self, index: usize) -> f64 {
        let bars = self.series.bars();
        let start = index.saturating_sub(self.period);
        let mut best = f64::NEG_INFINITY;
        let mut best_index = start;
        for i in start..=index {
            if bars[i].high >= best {
                best = bars[i].high;
                best_index = i;
            }
        }
        let bars_since = index - best_index;
        100.0 * (self.period - bars_since) as f64 / self.period as f64
    }

    fn down_at(&self, index: usize) -> f64 {
        let bars = self.series.bars();
        let start = index.saturating_sub(self.period);
        let mut best = f64::INFINITY;
        let mut best_index = start;
        for i in start..=index {
            if bars[i].low <= best {
                best = bars[i].low;
                best_index = i;
            }
        }
        let bars_since = index - best_index;
        100.0 * (self.period - bars_since) as f64 / self.period as f64
    }
}

impl Indicator for Aroon {
    fn value_at(&self, index: usize) -> f64 {
        self.memo.get_or_compute(index, || match self.band {
            AroonBand::Up => self.up_at(index),
            AroonBand::Down => self.down_at(index),
            AroonBand::Oscillator => self.up_at(index) - self.down_at(index),
        })
    }

    fn unstable_bars(&self) -> usize {
        self.period
    }
}
