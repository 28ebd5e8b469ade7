//! Channel indicators: Bollinger, Donchian, Keltner.
//!
//! Each family is one struct with a band selector, so the registry can hand
//! out separate instances per band while sharing the construction code.
//! Multipliers come from the caller (the registry fixes them at 2).

use std::sync::Arc;

use crate::domain::BarSeries;
use crate::indicators::average::{Ema, Sma};
use crate::indicators::extremes::{HighestValue, LowestValue};
use crate::indicators::price::{ClosePrice, HighPrice, LowPrice, TypicalPrice};
use crate::indicators::volatility::{Atr, StdDev};
use crate::indicators::Indicator;

/// Which Bollinger value to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
    Width,
    PercentB,
}

/// Bollinger bands: SMA(close) +/- multiplier * population stddev(close).
///
/// `Width` is the band spread as a percentage of the middle band;
/// `PercentB` is the close's position inside the band on a 0..1 scale.
#[derive(Debug)]
pub struct Bollinger {
    close: Arc<dyn Indicator>,
    middle: Sma,
    deviation: StdDev,
    multiplier: f64,
    band: BollingerBand,
    period: usize,
}

impl Bollinger {
    pub fn new(series: Arc<BarSeries>, period: usize, multiplier: f64, band: BollingerBand) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        let close: Arc<dyn Indicator> = Arc::new(ClosePrice::new(series));
        Self {
            middle: Sma::new(close.clone(), period),
            deviation: StdDev::new(close.clone(), period),
            close,
            multiplier,
            band,
            period,
        }
    }

    pub fn upper(series: Arc<BarSeries>, period: usize, multiplier: f64) -> Self {
        Self::new(series, period, multiplier, BollingerBand::Upper)
    }

    pub fn middle(series: Arc<BarSeries>, period: usize) -> Self {
        Self::new(series, period, 0.0, BollingerBand::Middle)
    }

    pub fn lower(series: Arc<BarSeries>, period: usize, multiplier: f64) -> Self {
        Self::new(series, period, multiplier, BollingerBand::Lower)
    }

    pub fn width(series: Arc<BarSeries>, period: usize, multiplier: f64) -> Self {
        Self::new(series, period, multiplier, BollingerBand::Width)
    }

    pub fn percent_b(series: Arc<BarSeries>, period: usize, multiplier: f64) -> Self {
        Self::new(series, period, multiplier, BollingerBand::PercentB)
    }
}

impl Indicator for Bollinger {
    fn value_at(&self, index: usize) -> f64 {
        let mean = self.middle.value_at(index);
        match self.band {
            BollingerBand::Middle => mean,
            BollingerBand::Upper => mean + self.multiplier * self.deviation.value_at(index),
            BollingerBand::Lower => mean - self.multiplier * self.deviation.value_at(index),
            BollingerBand::Width => {
                let spread = 2.0 * self.multiplier * self.deviation.value_at(index);
                100.0 * spread / mean
            }
            BollingerBand::PercentB => {
                let half = self.multiplier * self.deviation.value_at(index);
                (self.close.value_at(index) - (mean - half)) / (2.0 * half)
            }
        }
    }

    fn unstable_bars(&self) -> usize {
        self.period.saturating_sub(1)
    }
}

/// Which Donchian value to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonchianBand {
    Upper,
    Middle,
    Lower,
}

/// Donchian channel: highest high / lowest low over the window, middle is
/// their midpoint.
#[derive(Debug)]
pub struct Donchian {
    highest: HighestValue,
    lowest: LowestValue,
    band: DonchianBand,
    period: usize,
}

impl Donchian {
    pub fn new(series: Arc<BarSeries>, period: usize, band: DonchianBand) -> Self {
        assert!(period >= 1, "Donchian period must be >= 1");
        Self {
            highest: HighestValue::new(Arc::new(HighPrice::new(series.clone())), period),
            lowest: LowestValue::new(Arc::new(LowPrice::new(series)), period),
            band,
            period,
        }
    }

    pub fn upper(series: Arc<BarSeries>, period: usize) -> Self {
        Self::new(series, period, DonchianBand::Upper)
    }

    pub fn middle(series: Arc<BarSeries>, period: usize) -> Self {
        Self::new(series, period, DonchianBand::Middle)
    }

    pub fn lower(series: Arc<BarSeries>, period: usize) -> Self {
        Self::new(series, period, DonchianBand::Lower)
    }
}

impl Indicator for Donchian {
    fn value_at(&self, index: usize) -> f64 {
        match self.band {
            DonchianBand::Upper => self.highest.value_at(index),
            DonchianBand::Lower => self.lowest.value_at(index),
            DonchianBand::Middle => {
                (self.highest.value_at(index) + self.lowest.value_at(index)) / 2.0
            }
        }
    }

    fn unstable_bars(&self) -> usize {
        self.period.saturating_sub(1)
    }
}

/// Which Keltner value to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeltnerBand {
    Upper,
    Middle,
    Lower,
}

/// Keltner channel: EMA of the typical price +/- multiplier * ATR.
#[derive(Debug)]
pub struct Keltner {
    middle: Ema,
    atr: Atr,
    multiplier: f64,
    band: KeltnerBand,
    period: usize,
}

impl Keltner {
    pub fn new(series: Arc<BarSeries>, period: usize, multiplier: f64, band: KeltnerBand) -> Self {
        assert!(period >= 1, "Keltner period must be >= 1");
        Self {
            middle: Ema::new(Arc::new(TypicalPrice::new(series.clone())), period),
            atr: Atr::new(series, period),
            multiplier,
            band,
            period,
        }
    }

    pub fn upper(series: Arc<BarSeries>, period: usize, multiplier: f64) -> Self {
        Self::new(series, period, multiplier, KeltnerBand::Upper)
    }

    pub fn middle(series: Arc<BarSeries>, period: usize) -> Self {
        Self::new(series, period, 0.0, KeltnerBand::Middle)
    }

    pub fn lower(series: Arc<BarSeries>, period: usize, multiplier: f64) -> Self {
        Self::new(series, period, multiplier, KeltnerBand::Lower)
    }
}

impl Indicator for Keltner {
    fn value_at(&self, index: usize) -> f64 {
        let middle = self.middle.value_at(index);
        match self.band {
            KeltnerBand::Middle => middle,
            KeltnerBand::Upper => middle + self.multiplier * self.atr.value_at(index),
            KeltnerBand::Lower => middle - self.multiplier * self.atr.value_at(index),
        }
    }

    fn unstable_bars(&self) -> usize {
        self.period.saturating_sub(1)
    }
}
