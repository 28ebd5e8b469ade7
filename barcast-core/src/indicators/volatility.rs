//! True range, ATR and dispersion statistics.

use std::sync::Arc;

use crate::domain::BarSeries;
use crate::indicators::average::Mma;
use crate::indicators::{Indicator, Memo};

/// True range: greatest of high-low, |high - previous close| and
/// |previous close - low|. Index 0 falls back to high-low.
#[derive(Debug)]
pub struct TrueRange {
    series: Arc<BarSeries>,
}

impl TrueRange {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self { series }
    }
}

impl Indicator for TrueRange {
    fn value_at(&self, index: usize) -> f64 {
        let bars = self.series.bars();
        let bar = &bars[index];
        let range = (bar.high - bar.low).abs();
        if index == 0 {
            return range;
        }
        let prev_close = bars[index - 1].close;
        range
            .max((bar.high - prev_close).abs())
            .max((prev_close - bar.low).abs())
    }

    fn unstable_bars(&self) -> usize {
        1
    }
}

/// Average true range: Wilder smoothing of the true range.
#[derive(Debug)]
pub struct Atr {
    smoothed: Mma,
    period: usize,
}

impl Atr {
    pub fn new(series: Arc<BarSeries>, period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            smoothed: Mma::new(Arc::new(TrueRange::new(series)), period),
            period,
        }
    }
}

impl Indicator for Atr {
    fn value_at(&self, index: usize) -> f64 {
        self.smoothed.value_at(index)
    }

    fn unstable_bars(&self) -> usize {
        self.period.saturating_sub(1)
    }
}

/// Population variance of the source over the trailing window.
#[derive(Debug)]
pub struct Variance {
    source: Arc<dyn Indicator>,
    period: usize,
    memo: Memo,
}

impl Variance {
    pub fn new(source: Arc<dyn Indicator>, period: usize) -> Self {
        assert!(period >= 1, "variance period must be >= 1");
        Self {
            source,
            period,
            memo: Memo::new(),
        }
    }
}

impl Indicator for Variance {
    fn value_at(&self, index: usize) -> f64 {
        self.memo.get_or_compute(index, || {
            let start = (index + 1).saturating_sub(self.period);
            let n = (index - start + 1) as f64;
            let mean = (start..=index).map(|i| self.source.value_at(i)).sum::<f64>() / n;
            (start..=index)
                .map(|i| {
                    let d = self.source.value_at(i) - mean;
                    d * d
                })
                .sum::<f64>()
                / n
        })
    }

    fn unstable_bars(&self) -> usize {
        self.period.saturating_sub(1)
    }
}

/// Standard deviation: square root of the population variance.
#[derive(Debug)]
pub struct StdDev {
    variance: Variance,
}

impl StdDev {
    pub fn new(source: Arc<dyn Indicator>, period: usize) -> Self {
        Self {
            variance: Variance::new(source, period),
        }
    }
}

impl Indicator for StdDev {
    fn value_at(&self, index: usize) -> f64 {
        self.variance.value_at(index).sqrt()
    }

    fn unstable_bars(&self) -> usize {
        self.variance.unstable_bars()
    }
}

/// Mean absolute deviation of the source around its window mean.
#[derive(Debug)]
pub struct MeanDeviation {
    source: Arc<dyn Indicator>,
    period: usize,
    memo: Memo,
}

impl MeanDeviation {
    pub fn new(source: Arc<dyn Indicator>, period: usize) -> Self {
        assert!(period >= 1, "mean-deviation period must be >= 1");
        Self {
            source,
            period,
            memo: Memo::new(),
        }
    }
}

impl Indicator for MeanDeviation {
    fn value_at(&self, index: usize) -> f64 {
        self.memo.get_or_compute(index, || {
            let start = (index + 1).saturating_sub(self.period);
            let n = (index - start + 1) as f64;
            let mean = (start..=index).map(|i| self.source.value_at(i)).sum::<f64>() / n;
            (start..=index)
                .map(|i| (self.source.value_at(i) - mean).abs())
                .sum::<f64>()
                / n
        })
    }

    fn unstable_bars(&self) -> usize {
        self.period.saturating_sub(1)
    }
}
