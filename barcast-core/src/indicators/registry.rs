//! Indicator catalog keyed by `"family: member"` strings.
//!
//! The whole user-supplied name is trimmed, lowercased and looked up
//! verbatim, so `" SMA: sma "` and `"sma: sma"` resolve identically. An
//! unrecognized name falls back to the close price (with a warning) rather
//! than failing the request.
//!
//! A few entries carry historical construction quirks that callers rely on:
//! `sma`/`ema` never run below period 14, `rsi` substitutes 14 for
//! non-positive periods, `macd` derives its slow leg as twice the period,
//! and `maxh` ignores the period entirely.

use std::sync::Arc;

use tracing::warn;

use crate::domain::BarSeries;
use crate::indicators::aroon::Aroon;
use crate::indicators::arithmetic::{ClosePriceDifference, Gain, Loss, PreviousValue, RunningTotal};
use crate::indicators::average::{Ema, Mma, Sma, Wma};
use crate::indicators::candles::{
    BearishEngulfing, BullishEngulfing, Doji, LowerShadow, RealBody, UpperShadow,
};
use crate::indicators::channels::{Bollinger, Donchian, Keltner};
use crate::indicators::extremes::{CumulativeMax, HighestValue, LowestValue};
use crate::indicators::oscillators::{stochastic_d, Cci, Cmo, Macd, Roc, Rsi, StochasticK, WilliamsR};
use crate::indicators::price::{
    ClosePrice, Constant, HighPrice, LowPrice, MedianPrice, OpenPrice, TypicalPrice, Volume,
};
use crate::indicators::volatility::{Atr, MeanDeviation, StdDev, TrueRange, Variance};
use crate::indicators::volume::{AccumulationDistribution, Mfi, Obv, Vwap};
use crate::indicators::Indicator;

/// Bollinger and Keltner band multiplier.
const BAND_MULTIPLIER: f64 = 2.0;

/// Doji body-to-average threshold.
const DOJI_BODY_FACTOR: f64 = 0.03;

fn close(series: &Arc<BarSeries>) -> Arc<dyn Indicator> {
    Arc::new(ClosePrice::new(series.clone()))
}

/// Construct the indicator for a catalog key, or the close-price fallback.
pub fn create(series: &Arc<BarSeries>, raw_name: &str, period: i32) -> Arc<dyn Indicator> {
    let key = raw_name.trim().to_lowercase();
    // Windowed entries treat non-positive periods as 1 unless the entry has
    // its own substitution rule.
    let p = period.max(1) as usize;
    match key.as_str() {
        // Prices
        "open: open" => Arc::new(OpenPrice::new(series.clone())),
        "high: high" => Arc::new(HighPrice::new(series.clone())),
        "low: low" => Arc::new(LowPrice::new(series.clone())),
        "close: close" => Arc::new(ClosePrice::new(series.clone())),
        "volume: volume" => Arc::new(Volume::new(series.clone())),
        "typical_price: typical_price" => Arc::new(TypicalPrice::new(series.clone())),
        "median_price: median_price" => Arc::new(MedianPrice::new(series.clone())),

        // Moving averages
        "sma: sma" => {
            let p = if period > 14 { period } else { 14 } as usize;
            Arc::new(Sma::new(close(series), p))
        }
        "ema: ema" => {
            let p = if period > 14 { period } else { 14 } as usize;
            Arc::new(Ema::new(close(series), p))
        }
        "wma: wma" => Arc::new(Wma::new(close(series), p)),
        "mma: mma" => Arc::new(Mma::new(close(series), p)),

        // Oscillators
        "rsi: rsi" => {
            let p = if period > 0 { period } else { 14 } as usize;
            Arc::new(Rsi::new(series.clone(), p))
        }
        "stochastic: stochastic_k" => Arc::new(StochasticK::new(series.clone(), p)),
        "stochastic: stochastic_d" => Arc::new(stochastic_d(series.clone(), p)),
        "macd: macd" => Arc::new(Macd::new(series.clone(), p)),
        "roc: roc" => Arc::new(Roc::new(close(series), p)),
        "cci: cci" => Arc::new(Cci::new(series.clone(), p)),
        "cmo: cmo" => Arc::new(Cmo::new(series.clone(), p)),
        "williams_r: williams_r" => Arc::new(WilliamsR::new(series.clone(), p)),

        // Aroon
        "aroon: up" => Arc::new(Aroon::up(series.clone(), p)),
        "aroon: down" => Arc::new(Aroon::down(series.clone(), p)),
        "aroon: oscillator" => Arc::new(Aroon::oscillator(series.clone(), p)),

        // Volatility
        "atr: atr" => Arc::new(Atr::new(series.clone(), p)),
        "helpers: tr" => Arc::new(TrueRange::new(series.clone())),
        "standard_deviation: standard_deviation" => Arc::new(StdDev::new(close(series), p)),
        "variance: variance" => Arc::new(Variance::new(close(series), p)),
        "mean_deviation: mean_deviation" => Arc::new(MeanDeviation::new(close(series), p)),

        // Bollinger
        "bollinger: middle" => Arc::new(Bollinger::middle(series.clone(), p)),
        "bollinger: upper" => Arc::new(Bollinger::upper(series.clone(), p, BAND_MULTIPLIER)),
        "bollinger: lower" => Arc::new(Bollinger::lower(series.clone(), p, BAND_MULTIPLIER)),
        "bollinger: width" => Arc::new(Bollinger::width(series.clone(), p, BAND_MULTIPLIER)),
        "bollinger: percent_b" => Arc::new(Bollinger::percent_b(series.clone(), p, BAND_MULTIPLIER)),

        // Donchian
        "donchian: middle" => Arc::new(Donchian::middle(series.clone(), p)),
        "donchian: upper" => Arc::new(Donchian::upper(series.clone(), p)),
        "donchian: lower" => Arc::new(Donchian::lower(series.clone(), p)),

        // Keltner
        "keltner: middle" => Arc::new(Keltner::middle(series.clone(), p)),
        "keltner: upper" => Arc::new(Keltner::upper(series.clone(), p, BAND_MULTIPLIER)),
        "keltner: lower" => Arc::new(Keltner::lower(series.clone(), p, BAND_MULTIPLIER)),

        // Extremes
        "helpers: highest_value" => Arc::new(HighestValue::new(close(series), p)),
        "helpers: lowest_value" => Arc::new(LowestValue::new(close(series), p)),
        "maxh: maxh" => Arc::new(CumulativeMax::new(Arc::new(HighPrice::new(series.clone())))),

        // Volume
        "obv: obv" => Arc::new(Obv::new(series.clone())),
        "vwap: vwap" => Arc::new(Vwap::new(series.clone(), p)),
        "mfi: mfi" => Arc::new(Mfi::new(series.clone(), p)),
        "accumulation_distribution: accumulation_distribution" => {
            Arc::new(AccumulationDistribution::new(series.clone()))
        }

        // Helpers
        "helpers: gain" => Arc::new(Gain::new(close(series))),
        "helpers: loss" => Arc::new(Loss::new(close(series))),
        "helpers: close_price_difference" => Arc::new(ClosePriceDifference::new(series.clone())),
        "helpers: previous_value" => Arc::new(PreviousValue::new(close(series), p)),
        "helpers: running_total" => Arc::new(RunningTotal::new(close(series), p)),
        "helpers: constant" => Arc::new(Constant::new(period as f64)),

        // Candles
        "candles: real_body" => Arc::new(RealBody::new(series.clone())),
        "candles: upper_shadow" => Arc::new(UpperShadow::new(series.clone())),
        "candles: lower_shadow" => Arc::new(LowerShadow::new(series.clone())),
        "candles: doji" => Arc::new(Doji::new(series.clone(), p, DOJI_BODY_FACTOR)),
        "candles: bullish_engulfing" => Arc::new(BullishEngulfing::new(series.clone())),
        "candles: bearish_engulfing" => Arc::new(BearishEngulfing::new(series.clone())),

        _ => {
            warn!(indicator = %key, "unknown indicator name, using close price");
            Arc::new(ClosePrice::new(series.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_series, DEFAULT_EPSILON};

    #[test]
    fn key_lookup_trims_and_lowercases() {
        let series = make_series(&[10.0, 11.0, 12.0]);
        let a = create(&series, "  SMA: SMA  ", 20);
        let b = create(&series, "sma: sma", 20);
        assert_approx(a.value_at(2), b.value_at(2), DEFAULT_EPSILON);
    }

    #[test]
    fn sma_period_is_floored_at_14() {
        let closes: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let series = make_series(&closes);
        let clamped = create(&series, "sma: sma", 5);
        let explicit = Sma::new(close(&series), 14);
        assert_approx(clamped.value_at(19), explicit.value_at(19), DEFAULT_EPSILON);
        assert_eq!(clamped.unstable_bars(), 13);
    }

    #[test]
    fn rsi_substitutes_default_period() {
        let closes: Vec<f64> = (1..=20).map(|i| (i as f64 * 0.7).sin() + 10.0).collect();
        let series = make_series(&closes);
        let defaulted = create(&series, "rsi: rsi", 0);
        let explicit = Rsi::new(series.clone(), 14);
        assert_approx(defaulted.value_at(19), explicit.value_at(19), DEFAULT_EPSILON);
    }

    #[test]
    fn unknown_name_falls_back_to_close() {
        let series = make_series(&[10.0, 11.0, 12.0]);
        let fallback = create(&series, "no_such: indicator", 14);
        assert_approx(fallback.value_at(1), 11.0, DEFAULT_EPSILON);
    }

    #[test]
    fn maxh_ignores_period() {
        let series = make_series(&[10.0, 12.0, 9.0, 11.0]);
        // Highs: 11, 13, 13, 12; running max never uses the period argument.
        let a = create(&series, "maxh: maxh", 2);
        let b = create(&series, "maxh: maxh", 50);
        for i in 0..4 {
            assert_approx(a.value_at(i), b.value_at(i), DEFAULT_EPSILON);
        }
        assert_approx(a.value_at(3), 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn constant_takes_value_from_period() {
        let series = make_series(&[10.0]);
        let constant = create(&series, "helpers: constant", 5);
        assert_approx(constant.value_at(0), 5.0, DEFAULT_EPSILON);
    }

    #[test]
    fn stochastic_d_is_smoothed_k() {
        let series = make_series(&[10.0, 12.0, 11.0]);
        let d = create(&series, "stochastic: stochastic_d", 3);
        // %K values 50, 75, 50.
        assert_approx(d.value_at(2), 175.0 / 3.0, DEFAULT_EPSILON);
    }
}
