//! Bar — the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar for a single instrument.
///
/// Built from store records with missing numeric fields already substituted
/// (0.0 for prices, 0 for volume). Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Bar {
    /// Typical price: (high + low + close) / 3.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Median price: (high + low) / 2.
    pub fn median_price(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// Bullish candle: close above open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Bearish candle: close below open.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}
