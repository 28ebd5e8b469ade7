//! Condition model — one comparison rule over indicator values.
//!
//! A condition names a main indicator leg, an optional "other" indicator leg,
//! a logic operator, and a constant. Per bar, the evaluator computes the main
//! value (and the other value when present), applies per-leg arithmetic
//! post-processing, and compares. Missing optional fields fall back to the
//! defaults below, applied at read time so the wire form round-trips
//! unchanged.

pub mod eval;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PERIOD: i32 = 14;
pub const DEFAULT_OPERADOR: &str = "sum";
pub const DEFAULT_N_OPERADOR: f64 = 0.0;
pub const DEFAULT_DAY_OFFSET: i32 = 0;
pub const DEFAULT_ASSET: i32 = 0;
pub const DEFAULT_CONSTANT: f64 = 0.0;

/// One comparison rule as carried on the wire.
///
/// Field names follow the wire contract verbatim (`operador`, `n_operador`,
/// `const`). Every field is optional in the wire form; absent fields
/// serialize as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operador: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_operador: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_name: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_offset: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic_operator: Option<String>,
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_indicator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_operador: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_n_operador: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_period: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_asset_name: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_day_offset: Option<i32>,
}

/// One side of a condition with defaults already applied.
///
/// Borrowed view over a [`Condition`]; the evaluator only ever reads legs, so
/// the wire struct keeps its `Option` fields intact.
#[derive(Debug, Clone, Copy)]
pub struct Leg<'a> {
    pub indicator: Option<&'a str>,
    pub operador: &'a str,
    pub n_operador: f64,
    pub period: i32,
    pub asset: i32,
    pub day_offset: i32,
}

impl Condition {
    /// Main leg with defaults applied.
    pub fn main_leg(&self) -> Leg<'_> {
        Leg {
            indicator: self.indicator.as_deref(),
            operador: self.operador.as_deref().unwrap_or(DEFAULT_OPERADOR),
            n_operador: self.n_operador.unwrap_or(DEFAULT_N_OPERADOR),
            period: self.period.unwrap_or(DEFAULT_PERIOD),
            asset: self.asset_name.unwrap_or(DEFAULT_ASSET),
            day_offset: self.day_offset.unwrap_or(DEFAULT_DAY_OFFSET),
        }
    }

    /// Comparison-side leg with defaults applied. Only meaningful when
    /// `other_indicator` is present.
    pub fn other_leg(&self) -> Leg<'_> {
        Leg {
            indicator: self.other_indicator.as_deref(),
            operador: self.other_operador.as_deref().unwrap_or(DEFAULT_OPERADOR),
            n_operador: self.other_n_operador.unwrap_or(DEFAULT_N_OPERADOR),
            period: self.other_period.unwrap_or(DEFAULT_PERIOD),
            asset: self.other_asset_name.unwrap_or(DEFAULT_ASSET),
            day_offset: self.other_day_offset.unwrap_or(DEFAULT_DAY_OFFSET),
        }
    }

    /// Comparison constant with the default applied.
    pub fn constant_or_default(&self) -> f64 {
        self.constant.unwrap_or(DEFAULT_CONSTANT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_wire_form() {
        let json = r#"{
            "indicator": "sma: sma",
            "period": 20,
            "logic_operator": ">",
            "const": 100.0
        }"#;
        let condition: Condition = serde_json::from_str(json).unwrap();
        assert_eq!(condition.indicator.as_deref(), Some("sma: sma"));
        assert_eq!(condition.period, Some(20));
        assert_eq!(condition.logic_operator.as_deref(), Some(">"));
        assert_eq!(condition.constant, Some(100.0));
        assert_eq!(condition.other_indicator, None);
    }

    #[test]
    fn const_keyword_is_renamed() {
        let condition = Condition {
            constant: Some(50.0),
            ..Condition::default()
        };
        let json = serde_json::to_string(&condition).unwrap();
        assert_eq!(json, r#"{"const":50.0}"#);

        let back: Condition = serde_json::from_str(&json).unwrap();
        assert_eq!(back.constant, Some(50.0));
    }

    #[test]
    fn absent_fields_are_skipped() {
        let condition = Condition::default();
        assert_eq!(serde_json::to_string(&condition).unwrap(), "{}");
    }

    #[test]
    fn main_leg_applies_defaults() {
        let condition = Condition::default();
        let leg = condition.main_leg();
        assert_eq!(leg.indicator, None);
        assert_eq!(leg.operador, "sum");
        assert_eq!(leg.n_operador, 0.0);
        assert_eq!(leg.period, 14);
        assert_eq!(leg.asset, 0);
        assert_eq!(leg.day_offset, 0);
    }

    #[test]
    fn other_leg_reads_other_fields() {
        let condition = Condition {
            indicator: Some("close: close".into()),
            period: Some(1),
            other_indicator: Some("sma: sma".into()),
            other_period: Some(50),
            other_operador: Some("mult".into()),
            other_n_operador: Some(1.05),
            other_day_offset: Some(-1),
            ..Condition::default()
        };
        let leg = condition.other_leg();
        assert_eq!(leg.indicator, Some("sma: sma"));
        assert_eq!(leg.period, 50);
        assert_eq!(leg.operador, "mult");
        assert_eq!(leg.n_operador, 1.05);
        assert_eq!(leg.day_offset, -1);
    }

    #[test]
    fn roundtrip_preserves_wire_form() {
        let json = r#"{"indicator":"rsi: rsi","period":14,"logic_operator":"<","const":30.0,"day_offset":-2}"#;
        let condition: Condition = serde_json::from_str(json).unwrap();
        let back = serde_json::to_string(&condition).unwrap();
        let reparsed: Condition = serde_json::from_str(&back).unwrap();
        assert_eq!(condition, reparsed);
    }
}
