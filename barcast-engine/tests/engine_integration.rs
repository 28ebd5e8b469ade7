//! End-to-end engine tests: batch vs streaming equivalence, cache
//! behavior, failure propagation, and the concatenated-JSON wire contract
//! over real multi-page histories.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;

use barcast_core::conditions::Condition;
use barcast_core::domain::{InstrumentId, StoreRecord};
use barcast_core::request::EvalRequest;

use barcast_engine::store::{BarStore, MemoryStore, StoreError, StorePage};
use barcast_engine::{Engine, EngineConfig, EngineError};

// ─── Shared helpers ──────────────────────────────────────────────────

fn history(days: u32, base: f64) -> Vec<StoreRecord> {
    (0..days)
        .map(|i| {
            let close = base + i as f64 * 0.5;
            StoreRecord {
                date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                open: Some(close - 0.4),
                high: Some(close + 1.2),
                low: Some(close - 1.5),
                close: Some(close),
                volume: Some(900 + i as i64 * 10),
            }
        })
        .collect()
}

fn condition(json: &str) -> Condition {
    serde_json::from_str(json).unwrap()
}

fn request_with_conditions(ids: Vec<InstrumentId>, conditions: Vec<Condition>) -> EvalRequest {
    let mut request = EvalRequest::new(ids, "2020-01-01");
    request.list_conditions_entry = Some(conditions);
    request
}

fn engine_over(store: Arc<dyn BarStore>, page_size: usize, stream_dir: &Path) -> Engine {
    let config = EngineConfig {
        page_size,
        max_workers: 3,
        stream_cache_dir: stream_dir.to_path_buf(),
        channel_capacity: 4,
        ..EngineConfig::default()
    };
    Engine::new(store, config)
}

/// Store that serves the first page of one instrument and then fails,
/// as a dropped connection would.
struct FlakyStore {
    inner: MemoryStore,
    fail_id: InstrumentId,
}

impl BarStore for FlakyStore {
    fn exists(&self, id: InstrumentId) -> bool {
        self.inner.exists(id)
    }

    fn load_full_history(&self, id: InstrumentId) -> Result<Vec<StoreRecord>, StoreError> {
        if id == self.fail_id {
            return Err(StoreError::Io("connection reset".into()));
        }
        self.inner.load_full_history(id)
    }

    fn load_page(
        &self,
        id: InstrumentId,
        start: NaiveDate,
        page: usize,
        page_size: usize,
    ) -> Result<StorePage, StoreError> {
        if id == self.fail_id && page >= 1 {
            return Err(StoreError::Io("connection reset".into()));
        }
        self.inner.load_page(id, start, page, page_size)
    }
}

// ─── Streaming equivalence and wire shape ────────────────────────────

#[test]
fn parallel_stream_matches_sequential_byte_for_byte() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new()
        .with_instrument(7, history(13, 140.0))
        .with_instrument(3, history(4, 90.0))
        .with_instrument(21, history(9, 260.0));
    let engine = engine_over(Arc::new(store), 5, dir.path());

    let request = request_with_conditions(
        vec![7, 3, 21],
        vec![
            condition(r#"{"indicator":"sma: sma","period":5,"logic_operator":">","const":100.0}"#),
            condition(
                r#"{"indicator":"close: close","logic_operator":">=","other_indicator":"ema: ema","other_period":3,"other_day_offset":-1}"#,
            ),
        ],
    );

    let mut sequential = Vec::new();
    engine.stream(&request, &mut sequential).unwrap();

    let mut parallel = Vec::new();
    engine.stream_parallel(&request, &mut parallel).unwrap();

    assert!(!sequential.is_empty());
    assert_eq!(sequential, parallel);
}

#[test]
fn streamed_output_is_concatenated_parseable_objects() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new()
        .with_instrument(1, history(6, 100.0))
        .with_instrument(2, history(3, 50.0));
    let engine = engine_over(Arc::new(store), 4, dir.path());

    let request = request_with_conditions(
        vec![1, 2],
        vec![condition(
            r#"{"indicator":"rsi: rsi","period":5,"logic_operator":"<","const":70.0}"#,
        )],
    );

    let mut sink = Vec::new();
    engine.stream(&request, &mut sink).unwrap();
    let text = String::from_utf8(sink).unwrap();

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);

    for (line, (expected_id, expected_bars)) in lines.iter().zip([(1, 6), (2, 3)]) {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["idnectum"], serde_json::json!(expected_id));
        assert_eq!(value["result"].as_array().unwrap().len(), expected_bars);
    }
}

#[test]
fn batch_and_stream_agree_without_conditions() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new()
        .with_instrument(4, history(11, 75.0))
        .with_instrument(8, history(2, 31.0));
    let engine = engine_over(Arc::new(store), 3, dir.path());
    let request = EvalRequest::new(vec![4, 8], "2020-01-01");

    let batch = engine.evaluate(&request).unwrap();

    let mut sink = Vec::new();
    engine.stream(&request, &mut sink).unwrap();
    let text = String::from_utf8(sink).unwrap();

    for (line, instrument) in text.lines().zip(batch.iter()) {
        let streamed: serde_json::Value = serde_json::from_str(line).unwrap();
        let batched = serde_json::to_value(instrument).unwrap();
        assert_eq!(streamed, batched);
    }
}

#[test]
fn stream_pages_begin_at_the_start_date() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new().with_instrument(6, history(10, 55.0)));
    let engine = engine_over(Arc::clone(&store) as Arc<dyn BarStore>, 3, dir.path());

    let request = EvalRequest::new(vec![6], "2020-01-05");
    let mut sink = Vec::new();
    engine.stream(&request, &mut sink).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(String::from_utf8(sink).unwrap().trim_end()).unwrap();
    let result = value["result"].as_array().unwrap();
    assert_eq!(result.len(), 6);
    assert_eq!(result[0]["fecha"], serde_json::json!("2020-01-05"));
    // Six remaining rows at page size 3 means two store pages.
    assert_eq!(store.page_loads(), 2);
}

// ─── Small series against a long indicator window ────────────────────

#[test]
fn long_window_over_short_series_still_yields_numbers() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new().with_instrument(7376, history(10, 150.0));
    let engine = engine_over(Arc::new(store), 1000, dir.path());

    let request = request_with_conditions(
        vec![7376],
        vec![condition(
            r#"{"indicator":"sma: sma","period":20,"day_offset":0,"logic_operator":">","const":100.0}"#,
        )],
    );

    let results = engine.evaluate(&request).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].idnectum, 7376);
    assert_eq!(results[0].result.len(), 10);

    for record in &results[0].result {
        let sma = record.indicator("0_sma: sma_20_sum_0_0").unwrap();
        assert!(sma.is_finite());
        assert!(sma > 100.0);
        assert_eq!(record.decisions(), &[true]);
    }
}

// ─── NULL substitution and non-finite values on the wire ─────────────

#[test]
fn null_store_fields_become_zeros_and_division_by_zero_streams_as_nan() {
    let dir = TempDir::new().unwrap();
    let mut rows = history(3, 42.0);
    rows[1].close = None;
    rows[1].volume = None;
    let store = MemoryStore::new().with_instrument(5, rows);
    let engine = engine_over(Arc::new(store), 1000, dir.path());

    let request = request_with_conditions(
        vec![5],
        vec![condition(
            r#"{"indicator":"close: close","operador":"div","n_operador":0.0,"logic_operator":">","const":0.0}"#,
        )],
    );

    let results = engine.evaluate(&request).unwrap();
    let records = &results[0].result;
    assert_eq!(records[1].close(), 0.0);

    // Division by zero is NaN, which never satisfies the comparison.
    for record in records {
        assert!(record.indicator("0_close: close_14_div_0_0").unwrap().is_nan());
        assert_eq!(record.decisions(), &[false]);
    }

    let mut sink = Vec::new();
    engine.stream(&request, &mut sink).unwrap();
    let text = String::from_utf8(sink).unwrap();
    assert!(text.contains("\"0_close: close_14_div_0_0\":\"NaN\""));
    assert!(text.contains("\"volume\":0"));
}

// ─── Response cache ──────────────────────────────────────────────────

#[test]
fn cached_response_is_byte_identical_to_the_computation() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new().with_instrument(9, history(8, 120.0));
    let engine = engine_over(Arc::new(store), 1000, dir.path());

    let request = request_with_conditions(
        vec![9],
        vec![condition(
            r#"{"indicator":"bollinger: upper","period":5,"logic_operator":"<","const":500.0}"#,
        )],
    );

    let uncached = serde_json::to_vec(&engine.evaluate_uncached(&request).unwrap()).unwrap();
    let first = serde_json::to_vec(&*engine.evaluate(&request).unwrap()).unwrap();
    let repeat = serde_json::to_vec(&*engine.evaluate(&request).unwrap()).unwrap();

    assert_eq!(uncached, first);
    assert_eq!(first, repeat);
}

// ─── Session cache eviction ──────────────────────────────────────────

#[test]
fn eviction_forces_a_fresh_store_load() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        MemoryStore::new()
            .with_instrument(1, history(5, 80.0))
            .with_instrument(2, history(5, 81.0)),
    );
    let engine = engine_over(Arc::clone(&store) as Arc<dyn BarStore>, 1000, dir.path());
    let request = EvalRequest::new(vec![1, 2], "2020-01-01");

    engine.evaluate_uncached(&request).unwrap();
    engine.evaluate_uncached(&request).unwrap();
    assert_eq!(store.full_loads(), 2);

    engine.session().evict(1);
    engine.evaluate_uncached(&request).unwrap();
    assert_eq!(store.full_loads(), 3);

    engine.session().evict_all();
    engine.evaluate_uncached(&request).unwrap();
    assert_eq!(store.full_loads(), 5);
}

// ─── Stream cache (durable replay) ───────────────────────────────────

#[test]
fn cached_stream_generates_once_then_replays() {
    let dir = TempDir::new().unwrap();
    let stream_dir = dir.path().join("stream");
    let store = Arc::new(
        MemoryStore::new()
            .with_instrument(7, history(9, 95.0))
            .with_instrument(2, history(4, 45.0)),
    );
    let engine = engine_over(Arc::clone(&store) as Arc<dyn BarStore>, 4, &stream_dir);

    let request = request_with_conditions(
        vec![7, 2],
        vec![condition(
            r#"{"indicator":"atr: atr","period":3,"logic_operator":">","const":0.0}"#,
        )],
    );

    let mut live = Vec::new();
    engine.stream(&request, &mut live).unwrap();

    let mut generated = Vec::new();
    engine.stream_cached(&request, &mut generated).unwrap();
    assert_eq!(generated, live);

    let pages_after_generation = store.page_loads();
    let mut replayed = Vec::new();
    engine.stream_cached(&request, &mut replayed).unwrap();
    assert_eq!(replayed, live);
    // The replay came from the cache file, not the store.
    assert_eq!(store.page_loads(), pages_after_generation);
}

#[test]
fn failed_generation_leaves_no_cache_file() {
    let dir = TempDir::new().unwrap();
    let stream_dir = dir.path().join("stream");
    let store = FlakyStore {
        inner: MemoryStore::new()
            .with_instrument(1, history(3, 60.0))
            .with_instrument(13, history(12, 70.0)),
        fail_id: 13,
    };
    let engine = engine_over(Arc::new(store), 4, &stream_dir);
    let request = EvalRequest::new(vec![1, 13], "2020-01-01");

    let mut sink = Vec::new();
    let err = engine.stream_cached(&request, &mut sink).unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::Io(_))));

    // Neither a completed file nor a leftover temp file may remain.
    let leftovers: Vec<_> = fs::read_dir(&stream_dir)
        .map(|entries| entries.map(|e| e.unwrap().path()).collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty(), "unexpected files: {leftovers:?}");

    // A retry attempts generation again instead of replaying a partial.
    let mut retry_sink = Vec::new();
    let err = engine.stream_cached(&request, &mut retry_sink).unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::Io(_))));
}

// ─── Failure propagation in parallel mode ────────────────────────────

#[test]
fn parallel_stream_fails_when_any_instrument_fails() {
    let dir = TempDir::new().unwrap();
    let store = FlakyStore {
        inner: MemoryStore::new()
            .with_instrument(1, history(3, 60.0))
            .with_instrument(13, history(12, 70.0))
            .with_instrument(5, history(6, 50.0)),
        fail_id: 13,
    };
    let engine = engine_over(Arc::new(store), 4, dir.path());
    let request = EvalRequest::new(vec![1, 13, 5], "2020-01-01");

    let mut sink = Vec::new();
    let err = engine.stream_parallel(&request, &mut sink).unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::Io(_))));

    let err = engine.evaluate(&request).unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::Io(_))));
    assert!(engine.response_cache().is_empty());
}
