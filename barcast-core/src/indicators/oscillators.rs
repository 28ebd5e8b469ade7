//! Momentum oscillators.
//!
//! RSI follows Wilder's formulation (MMA-smoothed gains and losses) with the
//! usual zero-loss special cases. The stochastic %D line is not a separate
//! type; the registry composes it as an SMA(3) over %K.

use std::sync::Arc;

use crate::domain::BarSeries;
use crate::indicators::arithmetic::{Gain, Loss};
use crate::indicators::average::{Ema, Mma, Sma};
use crate::indicators::price::{ClosePrice, TypicalPrice};
use crate::indicators::volatility::MeanDeviation;
use crate::indicators::{Indicator, Memo};

/// Relative strength index over close prices.
#[derive(Debug)]
pub struct Rsi {
    avg_gain: Mma,
    avg_loss: Mma,
    period: usize,
}

impl Rsi {
    pub fn new(series: Arc<BarSeries>, period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        let close: Arc<dyn Indicator> = Arc::new(ClosePrice::new(series));
        Self {
            avg_gain: Mma::new(Arc::new(Gain::new(close.clone())), period),
            avg_loss: Mma::new(Arc::new(Loss::new(close)), period),
            period,
        }
    }
}

impl Indicator for Rsi {
    fn value_at(&self, index: usize) -> f64 {
        let avg_gain = self.avg_gain.value_at(index);
        let avg_loss = self.avg_loss.value_at(index);
        if avg_loss == 0.0 {
            return if avg_gain == 0.0 { 0.0 } else { 100.0 };
        }
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }

    fn unstable_bars(&self) -> usize {
        self.period
    }
}

/// Stochastic oscillator %K: position of the close inside the trailing
/// high/low range, scaled to 0..100.
#[derive(Debug)]
pub struct StochasticK {
    series: Arc<BarSeries>,
    period: usize,
    memo: Memo,
}

impl StochasticK {
    pub fn new(series: Arc<BarSeries>, period: usize) -> Self {
        assert!(period >= 1, "stochastic period must be >= 1");
        Self {
            series,
            period,
            memo: Memo::new(),
        }
    }
}

impl Indicator for StochasticK {
    fn value_at(&self, index: usize) -> f64 {
        self.memo.get_or_compute(index, || {
            let bars = self.series.bars();
            let start = (index + 1).saturating_sub(self.period);
            let mut highest = f64::NEG_INFINITY;
            let mut lowest = f64::INFINITY;
            for bar in &bars[start..=index] {
                highest = highest.max(bar.high);
                lowest = lowest.min(bar.low);
            }
            100.0 * (bars[index].close - lowest) / (highest - lowest)
        })
    }

    fn unstable_bars(&self) -> usize {
        self.period.saturating_sub(1)
    }
}

/// Stochastic %D: SMA(3) of %K with the given lookback.
pub fn stochastic_d(series: Arc<BarSeries>, period: usize) -> Sma {
    Sma::new(Arc::new(StochasticK::new(series, period)), 3)
}

/// MACD line: EMA(close, period) - EMA(close, 2 * period).
#[derive(Debug)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    slow_period: usize,
}

impl Macd {
    pub fn new(series: Arc<BarSeries>, period: usize) -> Self {
        assert!(period >= 1, "MACD period must be >= 1");
        let close: Arc<dyn Indicator> = Arc::new(ClosePrice::new(series));
        Self {
            fast: Ema::new(close.clone(), period),
            slow: Ema::new(close, period * 2),
            slow_period: period * 2,
        }
    }
}

impl Indicator for Macd {
    fn value_at(&self, index: usize) -> f64 {
        self.fast.value_at(index) - self.slow.value_at(index)
    }

    fn unstable_bars(&self) -> usize {
        self.slow_period.saturating_sub(1)
    }
}

/// Rate of change: percent move of the source versus `period` indices back
/// (clamped to index 0 near the series start).
#[derive(Debug)]
pub struct Roc {
    source: Arc<dyn Indicator>,
    period: usize,
}

impl Roc {
    pub fn new(source: Arc<dyn Indicator>, period: usize) -> Self {
        assert!(period >= 1, "ROC period must be >= 1");
        Self { source, period }
    }
}

impl Indicator for Roc {
    fn value_at(&self, index: usize) -> f64 {
        let reference = self.source.value_at(index.saturating_sub(self.period));
        let value = self.source.value_at(index);
        100.0 * (value - reference) / reference
    }

    fn unstable_bars(&self) -> usize {
        self.period
    }
}

/// Commodity channel index over the typical price, Lambert's 0.015 factor.
#[derive(Debug)]
pub struct Cci {
    typical: Arc<dyn Indicator>,
    sma: Sma,
    mean_deviation: MeanDeviation,
    period: usize,
}

impl Cci {
    pub fn new(series: Arc<BarSeries>, period: usize) -> Self {
        assert!(period >= 1, "CCI period must be >= 1");
        let typical: Arc<dyn Indicator> = Arc::new(TypicalPrice::new(series));
        Self {
            sma: Sma::new(typical.clone(), period),
            mean_deviation: MeanDeviation::new(typical.clone(), period),
            typical,
            period,
        }
    }
}

impl Indicator for Cci {
    fn value_at(&self, index: usize) -> f64 {
        let typical = self.typical.value_at(index);
        let mean = self.sma.value_at(index);
        let deviation = self.mean_deviation.value_at(index);
        (typical - mean) / (0.015 * deviation)
    }

    fn unstable_bars(&self) -> usize {
        self.period.saturating_sub(1)
    }
}

/// Chande momentum oscillator: 100 * (sum gains - sum losses) / (sum gains
/// + sum losses) over the trailing window.
#[derive(Debug)]
pub struct Cmo {
    gain: Arc<dyn Indicator>,
    loss: Arc<dyn Indicator>,
    period: usize,
    memo: Memo,
}

impl Cmo {
    pub fn new(series: Arc<BarSeries>, period: usize) -> Self {
        assert!(period >= 1, "CMO period must be >= 1");
        let close: Arc<dyn Indicator> = Arc::new(ClosePrice::new(series));
        Self {
            gain: Arc::new(Gain::new(close.clone())),
            loss: Arc::new(Loss::new(close)),
            period,
            memo: Memo::new(),
        }
    }
}

impl Indicator for Cmo {
    fn value_at(&self, index: usize) -> f64 {
        self.memo.get_or_compute(index, || {
            let start = (index + 1).saturating_sub(self.period);
            let mut gains = 0.0;
            let mut losses = 0.0;
            for i in start..=index {
                gains += self.gain.value_at(i);
                losses += self.loss.value_at(i);
            }
            100.0 * (gains - losses) / (gains + losses)
        })
    }

    fn unstable_bars(&self) -> usize {
        self.period
    }
}

/// Williams %R: like stochastic %K but anchored to the highest high,
/// scaled to -100..0.
#[derive(Debug)]
pub struct WilliamsR {
    series: Arc<BarSeries>,
    period: usize,
    memo: Memo,
}

impl WilliamsR {
    pub fn new(series: Arc<BarSeries>, period: usize) -> Self {
        assert!(period >= 1, "Williams %R period must be >= 1");
        Self {
            series,
            period,
            memo: Memo::new(),
        }
    }
}

impl Indicator for WilliamsR {
    fn value_at(&self, index: usize) -> f64 {
        self.memo.get_or_compute(index, || {
            let bars = self.series.bars();
            let start = (index + 1).saturating_sub(self.period);
            let mut highest = f64::NEG_INFINITY;
            let mut lowest = f64::INFINITY;
            for bar in &bars[start..=index] {
                highest = highest.max(bar.high);
                lowest = lowest.min(bar.low);
            }
            (highest - bars[index].close) / (highest - lowest) * -100.0
        })
    }

    fn unstable_bars(&self) -> usize {
        self.period.saturating_sub(1)
    }
}
