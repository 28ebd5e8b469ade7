//! Criterion benchmarks for evaluation hot paths.
//!
//! Benchmarks:
//! 1. Single-indicator scans (SMA, EMA, RSI, ATR over a full series)
//! 2. Full condition pass (multi-condition evaluation over every bar)
//! 3. Record serialization (the per-record wire encoding)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use barcast_core::conditions::eval::evaluate_conditions;
use barcast_core::conditions::Condition;
use barcast_core::domain::{Bar, BarSeries};
use barcast_core::indicators::{registry, IndicatorCache};
use barcast_core::record::ResultRecord;

fn make_series(n: usize) -> Arc<BarSeries> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let mut series = BarSeries::new("bench");
    for i in 0..n {
        let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
        let open = close - 0.3;
        series.push(Bar {
            date: base_date + chrono::Duration::days(i as i64),
            open,
            high: close + 1.5,
            low: close - 1.5,
            close,
            volume: 1_000_000 + (i as i64 % 500_000),
        });
    }
    Arc::new(series)
}

fn entry_conditions() -> Vec<Condition> {
    vec![
        Condition {
            indicator: Some("sma: sma".into()),
            period: Some(20),
            logic_operator: Some(">".into()),
            constant: Some(100.0),
            ..Condition::default()
        },
        Condition {
            indicator: Some("rsi: rsi".into()),
            period: Some(14),
            logic_operator: Some("<".into()),
            constant: Some(70.0),
            ..Condition::default()
        },
        Condition {
            indicator: Some("close: close".into()),
            period: Some(1),
            logic_operator: Some(">".into()),
            other_indicator: Some("bollinger: upper".into()),
            other_period: Some(20),
            ..Condition::default()
        },
    ]
}

fn bench_indicator_scan(c: &mut Criterion) {
    let series = make_series(2_520);
    let mut group = c.benchmark_group("indicator_scan");
    for name in ["sma: sma", "ema: ema", "rsi: rsi", "atr: atr"] {
        group.bench_with_input(BenchmarkId::from_parameter(name), name, |b, name| {
            b.iter(|| {
                let indicator = registry::create(&series, name, 20);
                let mut acc = 0.0;
                for i in 0..series.len() {
                    acc += black_box(indicator.value_at(i));
                }
                acc
            });
        });
    }
    group.finish();
}

fn bench_condition_pass(c: &mut Criterion) {
    let conditions = entry_conditions();
    let mut group = c.benchmark_group("condition_pass");
    for n in [250usize, 1_000, 2_520] {
        let series = make_series(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &series, |b, series| {
            b.iter(|| {
                let mut cache = IndicatorCache::new(series.clone());
                let mut records = Vec::with_capacity(series.len());
                for index in 0..series.len() {
                    let mut record = ResultRecord::from_bar(&series.bars()[index]);
                    evaluate_conditions(&conditions, index, &mut cache, &mut record);
                    records.push(record);
                }
                records
            });
        });
    }
    group.finish();
}

fn bench_record_serialization(c: &mut Criterion) {
    let series = make_series(1_000);
    let conditions = entry_conditions();
    let mut cache = IndicatorCache::new(series.clone());
    let mut records = Vec::with_capacity(series.len());
    for index in 0..series.len() {
        let mut record = ResultRecord::from_bar(&series.bars()[index]);
        evaluate_conditions(&conditions, index, &mut cache, &mut record);
        records.push(record);
    }

    c.bench_function("record_serialization_1000", |b| {
        b.iter(|| serde_json::to_string(black_box(&records)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_indicator_scan,
    bench_condition_pass,
    bench_record_serialization
);
criterion_main!(benches);
