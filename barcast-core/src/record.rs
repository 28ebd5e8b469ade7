//! Ordered result records and the per-instrument response shell.
//!
//! Wire field order is part of the contract: OHLCV first (volume as an
//! integer), then indicator value fields in evaluation order, then one
//! `entry_decision_{i}` boolean per condition, then `fecha` last.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::domain::{Bar, InstrumentId};

/// One output row for one bar.
///
/// Indicator fields keep emission order; re-emitting a name replaces the
/// value and moves the field to the end of the indicator block. Decisions are
/// positional and pad with `false` when a later slot is set first.
///
/// Non-finite indicator values serialize as JSON strings (`"NaN"`,
/// `"Infinity"`, `"-Infinity"`), matching the wire contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
    values: Vec<(String, f64)>,
    decisions: Vec<bool>,
    fecha: String,
}

impl ResultRecord {
    pub fn from_bar(bar: &Bar) -> Self {
        Self {
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            values: Vec::new(),
            decisions: Vec::new(),
            fecha: bar.date.format("%Y-%m-%d").to_string(),
        }
    }

    /// Emit one indicator value field.
    pub fn put_indicator(&mut self, name: &str, value: f64) {
        if let Some(position) = self.values.iter().position(|(n, _)| n == name) {
            self.values.remove(position);
        }
        self.values.push((name.to_string(), value));
    }

    /// Set the decision for condition slot `index`, padding earlier slots
    /// with `false`.
    pub fn set_decision(&mut self, index: usize, decision: bool) {
        if self.decisions.len() <= index {
            self.decisions.resize(index + 1, false);
        }
        self.decisions[index] = decision;
    }

    pub fn indicator(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn values(&self) -> &[(String, f64)] {
        &self.values
    }

    pub fn decisions(&self) -> &[bool] {
        &self.decisions
    }

    pub fn fecha(&self) -> &str {
        &self.fecha
    }

    pub fn close(&self) -> f64 {
        self.close
    }
}

impl Serialize for ResultRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let field_count = 5 + self.values.len() + self.decisions.len() + 1;
        let mut map = serializer.serialize_map(Some(field_count))?;
        map.serialize_entry("open", &self.open)?;
        map.serialize_entry("high", &self.high)?;
        map.serialize_entry("low", &self.low)?;
        map.serialize_entry("close", &self.close)?;
        map.serialize_entry("volume", &self.volume)?;
        for (name, value) in &self.values {
            serialize_wire_double(&mut map, name, *value)?;
        }
        for (index, decision) in self.decisions.iter().enumerate() {
            map.serialize_entry(&format!("entry_decision_{index}"), decision)?;
        }
        map.serialize_entry("fecha", &self.fecha)?;
        map.end()
    }
}

fn serialize_wire_double<M: SerializeMap>(map: &mut M, name: &str, value: f64) -> Result<(), M::Error> {
    if value.is_nan() {
        map.serialize_entry(name, "NaN")
    } else if value == f64::INFINITY {
        map.serialize_entry(name, "Infinity")
    } else if value == f64::NEG_INFINITY {
        map.serialize_entry(name, "-Infinity")
    } else {
        map.serialize_entry(name, &value)
    }
}

/// Per-instrument response object: `{"idnectum": N, "result": [records]}`.
///
/// Batch responses are a JSON array of these in request order; the streaming
/// wire writes them back-to-back, each followed by a newline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentResult {
    pub idnectum: InstrumentId,
    pub result: Vec<ResultRecord>,
}
