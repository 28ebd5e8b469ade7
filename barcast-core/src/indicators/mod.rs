//! Indicator capability trait, per-index memoization, and the registry.
//!
//! Every indicator answers `value_at(index)` for any index in `0..len` of its
//! series, computing from the truncated history inside the leading unstable
//! window (a short SMA window still yields a number, never a panic or a NaN
//! caused by insufficient history). `unstable_bars()` reports how many leading
//! indices are not yet numerically meaningful.
//!
//! Instances are shared behind `Arc<dyn Indicator>` across caches and driver
//! tasks, so memoization is interior and thread-safe: `Memo` for indicators
//! whose indices are independent, `RecursiveMemo` for indicators whose value
//! at `i` depends on their own value at `i-1`.

pub mod aroon;
pub mod arithmetic;
pub mod average;
pub mod cache;
pub mod candles;
pub mod channels;
pub mod extremes;
pub mod oscillators;
pub mod price;
pub mod registry;
pub mod volatility;
pub mod volume;

pub use cache::{IndicatorCache, Role};

use std::sync::Mutex;

/// Capability interface for all indicators.
///
/// `value_at` must only be called with `index < series.len()`; the condition
/// evaluator performs the range check and maps out-of-range lookups to NaN
/// before ever reaching an indicator.
pub trait Indicator: Send + Sync + std::fmt::Debug {
    /// Value at the given bar index, memoized after first touch.
    fn value_at(&self, index: usize) -> f64;

    /// Number of leading indices whose value is not yet numerically
    /// meaningful (insufficient history). Values are still returned there.
    fn unstable_bars(&self) -> usize;
}

/// Per-index memo for indicators whose indices are computed independently.
///
/// The slot vector grows on demand; a slot is written at most once. The
/// compute closure may consult other indicators (each has its own lock, and
/// composition forms a DAG, so lock acquisition cannot cycle).
#[derive(Debug, Default)]
pub struct Memo {
    slots: Mutex<Vec<Option<f64>>>,
}

impl Memo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute<F>(&self, index: usize, compute: F) -> f64
    where
        F: FnOnce() -> f64,
    {
        let mut slots = self.slots.lock().unwrap();
        if let Some(Some(v)) = slots.get(index) {
            return *v;
        }
        if slots.len() <= index {
            slots.resize(index + 1, None);
        }
        let value = compute();
        slots[index] = Some(value);
        value
    }
}

/// Prefix memo for recursively-defined indicators (value at `i` depends on
/// the indicator's own value at `i-1`).
///
/// `get_or_fill` extends the memoized prefix up to `index` in one pass under
/// a single lock, feeding each step its predecessor's value. This replaces
/// recursive self-calls, which would re-enter the lock.
#[derive(Debug, Default)]
pub struct RecursiveMemo {
    values: Mutex<Vec<f64>>,
}

impl RecursiveMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_fill<F>(&self, index: usize, mut step: F) -> f64
    where
        F: FnMut(Option<f64>, usize) -> f64,
    {
        let mut values = self.values.lock().unwrap();
        while values.len() <= index {
            let i = values.len();
            let prev = if i == 0 { None } else { Some(values[i - 1]) };
            let next = step(prev, i);
            values.push(next);
        }
        values[index]
    }
}

/// Create a test series from close prices.
///
/// Generates plausible OHLV: open = prev_close (or close for the first bar),
/// high = max(open, close) + 1.0, low = min(open, close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_series(closes: &[f64]) -> std::sync::Arc<crate::domain::BarSeries> {
    use crate::domain::{Bar, BarSeries};
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let mut series = BarSeries::new("test");
    for (i, &close) in closes.iter().enumerate() {
        let open = if i == 0 { close } else { closes[i - 1] };
        series.push(Bar {
            date: base_date + chrono::Duration::days(i as i64),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume: 1000,
        });
    }
    std::sync::Arc::new(series)
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
