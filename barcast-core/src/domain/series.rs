//! Bar series — ordered, 0-indexed, append-only bars for one instrument.

use super::bar::Bar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One raw store row before substitution. Numeric fields are nullable at the
/// store boundary; the series builder turns NULLs into 0 / 0.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
}

impl StoreRecord {
    /// Substitute missing fields and produce the immutable bar.
    pub fn into_bar(self) -> Bar {
        Bar {
            date: self.date,
            open: self.open.unwrap_or(0.0),
            high: self.high.unwrap_or(0.0),
            low: self.low.unwrap_or(0.0),
            close: self.close.unwrap_or(0.0),
            volume: self.volume.unwrap_or(0),
        }
    }
}

/// Ordered sequence of bars for one instrument, indexed 0..N-1 ascending by
/// date. The name is used for diagnostics and cache keys only.
///
/// The builder trusts the input order as returned by the store; no
/// monotonicity validation is performed here. A series is never mutated by
/// evaluation.
#[derive(Debug, Clone)]
pub struct BarSeries {
    name: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bars: Vec::new(),
        }
    }

    /// Build a series from ordered store records, substituting 0 / 0.0 for
    /// missing numeric fields.
    pub fn from_records<I>(name: impl Into<String>, records: I) -> Self
    where
        I: IntoIterator<Item = StoreRecord>,
    {
        Self {
            name: name.into(),
            bars: records.into_iter().map(StoreRecord::into_bar).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append one bar. The series is append-only; bars are never removed or
    /// reordered.
    pub fn push(&mut self, bar: Bar) {
        self.bars.push(bar);
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    /// Index of the first bar dated on or after `date`, or `None` if every
    /// bar is earlier. Assumes ascending date order.
    pub fn first_index_on_or_after(&self, date: NaiveDate) -> Option<usize> {
        let idx = self.bars.partition_point(|b| b.date < date);
        (idx < self.bars.len()).then_some(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: NaiveDate, close: Option<f64>) -> StoreRecord {
        StoreRecord {
            date,
            open: Some(1.0),
            high: Some(2.0),
            low: Some(0.5),
            close,
            volume: Some(10),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, d).unwrap()
    }

    #[test]
    fn missing_fields_become_zero() {
        let series = BarSeries::from_records(
            "test",
            vec![StoreRecord {
                date: day(2),
                open: None,
                high: None,
                low: None,
                close: None,
                volume: None,
            }],
        );
        let bar = series.get(0).unwrap();
        assert_eq!(bar.open, 0.0);
        assert_eq!(bar.high, 0.0);
        assert_eq!(bar.low, 0.0);
        assert_eq!(bar.close, 0.0);
        assert_eq!(bar.volume, 0);
    }

    #[test]
    fn builder_preserves_input_order() {
        let series = BarSeries::from_records(
            "test",
            vec![record(day(2), Some(10.0)), record(day(3), Some(11.0))],
        );
        assert_eq!(series.len(), 2);
        assert_eq!(series.get(0).unwrap().close, 10.0);
        assert_eq!(series.get(1).unwrap().close, 11.0);
    }

    #[test]
    fn first_index_on_or_after_finds_start() {
        let series = BarSeries::from_records(
            "test",
            vec![
                record(day(2), Some(1.0)),
                record(day(6), Some(2.0)),
                record(day(9), Some(3.0)),
            ],
        );
        assert_eq!(series.first_index_on_or_after(day(1)), Some(0));
        assert_eq!(series.first_index_on_or_after(day(6)), Some(1));
        assert_eq!(series.first_index_on_or_after(day(7)), Some(2));
        assert_eq!(series.first_index_on_or_after(day(10)), None);
    }
}
