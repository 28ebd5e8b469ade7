//! Per-bar condition evaluation.
//!
//! One call evaluates one condition against one bar index and writes its
//! output into the result record: the main value, the other value when an
//! other indicator is named, and the positional boolean decision.
//!
//! Value availability rules, in order:
//! - No indicator name on the leg: the leg value is `0.0`, no arithmetic.
//! - Target index (`bar_index + day_offset`) outside `0..len`: the leg value
//!   is `NaN`, no arithmetic. A NaN operand always yields a `false` decision.
//! - Otherwise: the cached indicator value with arithmetic applied.

use crate::indicators::{IndicatorCache, Role};
use crate::record::ResultRecord;

use super::{Condition, Leg};

/// Absolute tolerance for the `==` logic operator.
pub const EQ_EPSILON: f64 = 1e-12;

/// Evaluate one condition at `bar_index`, emitting values and the decision
/// for slot `condition_index` into `record`.
pub fn evaluate_condition(
    condition: &Condition,
    condition_index: usize,
    bar_index: usize,
    cache: &mut IndicatorCache,
    record: &mut ResultRecord,
) {
    let main_leg = condition.main_leg();
    let main_value = leg_value(&main_leg, Role::Main, bar_index, cache);
    record.put_indicator(&value_field_name(&main_leg), main_value);

    let comparand = if condition.other_indicator.is_some() {
        let other_leg = condition.other_leg();
        let other_value = leg_value(&other_leg, Role::Other, bar_index, cache);
        record.put_indicator(&value_field_name(&other_leg), other_value);
        other_value
    } else {
        condition.constant_or_default()
    };

    let decision = evaluate_logic(condition.logic_operator.as_deref(), main_value, comparand);
    record.set_decision(condition_index, decision);
}

/// Evaluate every condition in declared order against one bar.
pub fn evaluate_conditions(
    conditions: &[Condition],
    bar_index: usize,
    cache: &mut IndicatorCache,
    record: &mut ResultRecord,
) {
    for (index, condition) in conditions.iter().enumerate() {
        evaluate_condition(condition, index, bar_index, cache, record);
    }
}

/// Raw-or-processed value for one leg at `bar_index + day_offset`.
///
/// The indicator instance is created (and cached) before the range check so
/// a leg that is out of range early in the series reuses the same instance
/// once the index walks into range.
fn leg_value(leg: &Leg<'_>, role: Role, bar_index: usize, cache: &mut IndicatorCache) -> f64 {
    let name = match leg.indicator {
        Some(name) => name,
        None => return 0.0,
    };
    let indicator = cache.get_or_create(name, leg.period, role);
    let target = bar_index as i64 + i64::from(leg.day_offset);
    if target < 0 || target >= cache.series().len() as i64 {
        return f64::NAN;
    }
    apply_arithmetic(indicator.value_at(target as usize), leg.operador, leg.n_operador)
}

/// Arithmetic post-processing applied to an in-range indicator value.
///
/// Operator matching is case-insensitive; an unrecognized operator leaves the
/// value untouched. `div` and `root` with a zero operand yield `NaN` rather
/// than infinity.
pub fn apply_arithmetic(value: f64, operador: &str, n: f64) -> f64 {
    match operador.to_lowercase().as_str() {
        "sum" => value + n,
        "rest" | "sub" => value - n,
        "mult" => value * n,
        "div" => {
            if n == 0.0 {
                f64::NAN
            } else {
                value / n
            }
        }
        "pow" => value.powf(n),
        "root" => {
            if n == 0.0 {
                f64::NAN
            } else {
                value.powf(1.0 / n)
            }
        }
        _ => value,
    }
}

/// Compare two leg values. NaN on either side, a missing operator, or an
/// unrecognized operator all yield `false`.
pub fn evaluate_logic(operator: Option<&str>, left: f64, right: f64) -> bool {
    if left.is_nan() || right.is_nan() {
        return false;
    }
    match operator {
        Some("<") => left < right,
        Some("<=") => left <= right,
        Some("==") => (left - right).abs() < EQ_EPSILON,
        Some(">=") => left >= right,
        Some(">") => left > right,
        _ => false,
    }
}

/// Wire field name for a leg's emitted value:
/// `{asset}_{indicator}_{period}_{operador}_{n}_{offset}`.
///
/// The arithmetic operand is truncated to an integer here for naming only;
/// computation always uses the full value.
pub fn value_field_name(leg: &Leg<'_>) -> String {
    format!(
        "{}_{}_{}_{}_{}_{}",
        leg.asset,
        leg.indicator.unwrap_or(""),
        leg.period,
        leg.operador,
        leg.n_operador as i64,
        leg.day_offset
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_series;

    fn record_for(cache: &IndicatorCache, index: usize) -> ResultRecord {
        ResultRecord::from_bar(&cache.series().bars()[index])
    }

    fn close_condition(logic: &str, constant: f64) -> Condition {
        Condition {
            indicator: Some("close: close".into()),
            period: Some(1),
            logic_operator: Some(logic.into()),
            constant: Some(constant),
            ..Condition::default()
        }
    }

    #[test]
    fn compares_against_constant() {
        let series = make_series(&[10.0, 11.0, 12.0]);
        let mut cache = IndicatorCache::new(series);
        let condition = close_condition(">", 10.5);

        let mut record = record_for(&cache, 2);
        evaluate_condition(&condition, 0, 2, &mut cache, &mut record);
        assert_eq!(record.decisions(), &[true]);
        assert_eq!(record.indicator("0_close: close_1_sum_0_0"), Some(12.0));

        let mut record = record_for(&cache, 0);
        evaluate_condition(&condition, 0, 0, &mut cache, &mut record);
        assert_eq!(record.decisions(), &[false]);
    }

    #[test]
    fn compares_against_other_indicator() {
        // close vs sma(2) of close: at index 2, close 12 > sma 11.5.
        let series = make_series(&[10.0, 11.0, 12.0]);
        let mut cache = IndicatorCache::new(series);
        let condition = Condition {
            indicator: Some("close: close".into()),
            period: Some(1),
            logic_operator: Some(">".into()),
            other_indicator: Some("helpers: running_total".into()),
            other_period: Some(1),
            ..Condition::default()
        };

        let mut record = record_for(&cache, 2);
        evaluate_condition(&condition, 0, 2, &mut cache, &mut record);
        // running_total over one bar equals close, so close > close is false.
        assert_eq!(record.decisions(), &[false]);
        assert_eq!(record.indicator("0_helpers: running_total_1_sum_0_0"), Some(12.0));
    }

    #[test]
    fn missing_indicator_name_is_zero_without_arithmetic() {
        let series = make_series(&[10.0, 11.0]);
        let mut cache = IndicatorCache::new(series);
        // operador sum with n 5 would turn 0.0 into 5.0 if arithmetic ran.
        let condition = Condition {
            operador: Some("sum".into()),
            n_operador: Some(5.0),
            logic_operator: Some("==".into()),
            constant: Some(0.0),
            ..Condition::default()
        };

        let mut record = record_for(&cache, 1);
        evaluate_condition(&condition, 0, 1, &mut cache, &mut record);
        assert_eq!(record.indicator("0__14_sum_5_0"), Some(0.0));
        assert_eq!(record.decisions(), &[true]);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn out_of_range_is_nan_without_arithmetic() {
        let series = make_series(&[10.0, 11.0]);
        let mut cache = IndicatorCache::new(series);
        // pow with operand 0 maps any finite value to 1.0; a NaN that went
        // through it would come out 1.0 and flip the decision.
        let condition = Condition {
            indicator: Some("close: close".into()),
            period: Some(1),
            operador: Some("pow".into()),
            n_operador: Some(0.0),
            day_offset: Some(5),
            logic_operator: Some("==".into()),
            constant: Some(1.0),
            ..Condition::default()
        };

        let mut record = record_for(&cache, 1);
        evaluate_condition(&condition, 0, 1, &mut cache, &mut record);
        let value = record.indicator("0_close: close_1_pow_0_5").unwrap();
        assert!(value.is_nan());
        assert_eq!(record.decisions(), &[false]);
        // The instance is still cached for later in-range bars.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn negative_offset_before_series_start_is_nan() {
        let series = make_series(&[10.0, 11.0, 12.0]);
        let mut cache = IndicatorCache::new(series);
        let condition = Condition {
            indicator: Some("close: close".into()),
            period: Some(1),
            day_offset: Some(-2),
            logic_operator: Some(">".into()),
            constant: Some(0.0),
            ..Condition::default()
        };

        let mut record = record_for(&cache, 1);
        evaluate_condition(&condition, 0, 1, &mut cache, &mut record);
        assert_eq!(record.decisions(), &[false]);

        let mut record = record_for(&cache, 2);
        evaluate_condition(&condition, 0, 2, &mut cache, &mut record);
        assert_eq!(record.decisions(), &[true]);
        assert_eq!(record.indicator("0_close: close_1_sum_0_-2"), Some(10.0));
    }

    #[test]
    fn day_offset_shifts_the_target_bar() {
        let series = make_series(&[10.0, 11.0, 12.0]);
        let mut cache = IndicatorCache::new(series);
        let condition = Condition {
            indicator: Some("close: close".into()),
            period: Some(1),
            day_offset: Some(1),
            logic_operator: Some("==".into()),
            constant: Some(12.0),
            ..Condition::default()
        };

        let mut record = record_for(&cache, 1);
        evaluate_condition(&condition, 0, 1, &mut cache, &mut record);
        assert_eq!(record.indicator("0_close: close_1_sum_0_1"), Some(12.0));
        assert_eq!(record.decisions(), &[true]);
    }

    #[test]
    fn conditions_fill_positional_decision_slots() {
        let series = make_series(&[10.0, 11.0]);
        let mut cache = IndicatorCache::new(series);
        let conditions = vec![
            close_condition("<", 100.0),
            close_condition(">", 100.0),
            close_condition("<=", 11.0),
        ];

        let mut record = record_for(&cache, 1);
        evaluate_conditions(&conditions, 1, &mut cache, &mut record);
        assert_eq!(record.decisions(), &[true, false, true]);
    }

    #[test]
    fn arithmetic_operators() {
        assert_eq!(apply_arithmetic(10.0, "sum", 2.0), 12.0);
        assert_eq!(apply_arithmetic(10.0, "rest", 2.0), 8.0);
        assert_eq!(apply_arithmetic(10.0, "sub", 2.0), 8.0);
        assert_eq!(apply_arithmetic(10.0, "mult", 2.0), 20.0);
        assert_eq!(apply_arithmetic(10.0, "div", 4.0), 2.5);
        assert_eq!(apply_arithmetic(3.0, "pow", 2.0), 9.0);
        assert_eq!(apply_arithmetic(9.0, "root", 2.0), 3.0);
        assert_eq!(apply_arithmetic(10.0, "noop", 2.0), 10.0);
        assert_eq!(apply_arithmetic(10.0, "SUM", 2.0), 12.0);
        assert!(apply_arithmetic(10.0, "div", 0.0).is_nan());
        assert!(apply_arithmetic(10.0, "root", 0.0).is_nan());
    }

    #[test]
    fn logic_operators() {
        assert!(evaluate_logic(Some("<"), 1.0, 2.0));
        assert!(evaluate_logic(Some("<="), 2.0, 2.0));
        assert!(evaluate_logic(Some(">="), 2.0, 2.0));
        assert!(evaluate_logic(Some(">"), 3.0, 2.0));
        assert!(!evaluate_logic(Some(">"), 2.0, 2.0));
        assert!(!evaluate_logic(Some("!="), 1.0, 2.0));
        assert!(!evaluate_logic(None, 1.0, 2.0));
    }

    #[test]
    fn equality_uses_epsilon() {
        assert!(evaluate_logic(Some("=="), 1.0000000000001, 1.0));
        assert!(!evaluate_logic(Some("=="), 1.01, 1.0));
    }

    #[test]
    fn nan_operand_never_satisfies() {
        for op in ["<", "<=", "==", ">=", ">"] {
            assert!(!evaluate_logic(Some(op), f64::NAN, 1.0));
            assert!(!evaluate_logic(Some(op), 1.0, f64::NAN));
        }
    }

    #[test]
    fn field_name_truncates_operand() {
        let condition = Condition {
            indicator: Some("sma: sma".into()),
            period: Some(20),
            operador: Some("mult".into()),
            n_operador: Some(2.9),
            day_offset: Some(-1),
            asset_name: Some(3),
            ..Condition::default()
        };
        assert_eq!(value_field_name(&condition.main_leg()), "3_sma: sma_20_mult_2_-1");
    }
}
