//! Execution driver: batch evaluation and the three streaming modes.
//!
//! Batch mode evaluates every instrument on a fixed worker pool, assembles
//! results in request order, and serves repeats from the response cache.
//! Streaming modes write the wire format incrementally: sequential reads
//! the store in pages and flushes per record; parallel runs one producer
//! per instrument with a bounded channel back to the caller's thread, which
//! drains them in request order so the bytes match the sequential mode;
//! cached mode tees the sequential stream into a fingerprint-keyed file and
//! replays that file for an identical later request.

use std::io::{self, Write};
use std::sync::mpsc::sync_channel;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rayon::prelude::*;

use barcast_core::conditions::eval::evaluate_conditions;
use barcast_core::conditions::Condition;
use barcast_core::domain::{BarSeries, InstrumentId};
use barcast_core::fingerprint::Fingerprint;
use barcast_core::indicators::IndicatorCache;
use barcast_core::record::{InstrumentResult, ResultRecord};
use barcast_core::request::EvalRequest;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::response_cache::ResponseCache;
use crate::session::SessionCache;
use crate::store::BarStore;
use crate::stream_cache::StreamCache;

/// Condition-evaluation engine over a bar store.
///
/// Owns the worker pool and the three caches (session, response, stream).
/// Caches are injectable so tests can start from a known state.
pub struct Engine {
    store: Arc<dyn BarStore>,
    session: Arc<SessionCache>,
    response_cache: Arc<ResponseCache>,
    stream_cache: Arc<StreamCache>,
    config: EngineConfig,
    pool: rayon::ThreadPool,
}

impl Engine {
    /// Engine with fresh caches derived from the config.
    pub fn new(store: Arc<dyn BarStore>, config: EngineConfig) -> Self {
        let session = Arc::new(SessionCache::new());
        let response_cache = Arc::new(ResponseCache::new(
            config.response_cache_capacity,
            Duration::from_secs(config.response_cache_ttl_secs),
        ));
        let stream_cache = Arc::new(StreamCache::new(config.stream_cache_dir.clone()));
        Self::with_caches(store, config, session, response_cache, stream_cache)
    }

    /// Engine over caller-owned caches.
    pub fn with_caches(
        store: Arc<dyn BarStore>,
        config: EngineConfig,
        session: Arc<SessionCache>,
        response_cache: Arc<ResponseCache>,
        stream_cache: Arc<StreamCache>,
    ) -> Self {
        // num_threads(0) lets rayon size the pool to the machine.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.max_workers)
            .thread_name(|i| format!("barcast-worker-{i}"))
            .build()
            .expect("failed to build Rayon thread pool");
        Self {
            store,
            session,
            response_cache,
            stream_cache,
            config,
            pool,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionCache {
        &self.session
    }

    pub fn response_cache(&self) -> &ResponseCache {
        &self.response_cache
    }

    pub fn stream_cache(&self) -> &StreamCache {
        &self.stream_cache
    }

    /// Batch evaluation: one result per requested instrument, in request
    /// order, served from the response cache when an identical request was
    /// already computed.
    pub fn evaluate(
        &self,
        request: &EvalRequest,
    ) -> Result<Arc<Vec<InstrumentResult>>, EngineError> {
        let fingerprint = Fingerprint::of(request);
        if let Some(hit) = self.response_cache.get(&fingerprint) {
            tracing::debug!("response cache hit for {fingerprint}");
            return Ok(hit);
        }
        let results = self.evaluate_uncached(request)?;
        Ok(self.response_cache.put(fingerprint, results))
    }

    /// Batch evaluation bypassing the response cache.
    ///
    /// Instruments run in parallel on the worker pool; the collected vector
    /// follows request order, and the first failing instrument fails the
    /// whole request with no partial output.
    pub fn evaluate_uncached(
        &self,
        request: &EvalRequest,
    ) -> Result<Vec<InstrumentResult>, EngineError> {
        let start = parse_date("start", &request.start)?;
        let end = parse_end_date(request)?;
        self.ensure_known(&request.idnectums)?;

        let conditions = request.entry_conditions();
        self.pool.install(|| {
            request
                .idnectums
                .par_iter()
                .map(|&id| self.evaluate_instrument(id, conditions, start, end))
                .collect()
        })
    }

    /// One instrument against the full cached history. Warmed indicator
    /// instances are published back to the session cache afterwards.
    fn evaluate_instrument(
        &self,
        id: InstrumentId,
        conditions: &[Condition],
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<InstrumentResult, EngineError> {
        let series = self.session.get_or_create_series(id, self.store.as_ref())?;
        let mut cache = IndicatorCache::new(Arc::clone(&series));
        self.session.seed_indicator_cache(id, &mut cache);

        let mut records = Vec::new();
        if let Some(first) = series.first_index_on_or_after(start) {
            for index in first..series.len() {
                let bar = &series.bars()[index];
                if end.is_some_and(|end| bar.date > end) {
                    break;
                }
                let mut record = ResultRecord::from_bar(bar);
                evaluate_conditions(conditions, index, &mut cache, &mut record);
                records.push(record);
            }
        }

        self.session.absorb_indicators(id, &cache);
        tracing::debug!("evaluated instrument {id}: {} record(s)", records.len());
        Ok(InstrumentResult {
            idnectum: id,
            result: records,
        })
    }

    /// Sequential-paginated streaming: instruments in request order, the
    /// store read in fixed-size pages, every record flushed as soon as it
    /// is serialized.
    pub fn stream(&self, request: &EvalRequest, sink: &mut dyn Write) -> Result<(), EngineError> {
        let start = parse_date("start", &request.start)?;
        let end = parse_end_date(request)?;
        self.ensure_known(&request.idnectums)?;

        let conditions = request.entry_conditions();
        for &id in &request.idnectums {
            stream_instrument(
                self.store.as_ref(),
                id,
                conditions,
                start,
                end,
                self.config.page_size,
                &mut |bytes| {
                    sink.write_all(&bytes)?;
                    sink.flush()?;
                    Ok(())
                },
            )?;
        }
        Ok(())
    }

    /// Parallel-per-instrument streaming.
    ///
    /// One producer per instrument runs on the worker pool and sends its
    /// bytes through a bounded channel; the caller's thread drains the
    /// channels in request order. The wire bytes are identical to
    /// [`Engine::stream`] for the same request. The first producer failure
    /// aborts the whole request.
    pub fn stream_parallel(
        &self,
        request: &EvalRequest,
        sink: &mut dyn Write,
    ) -> Result<(), EngineError> {
        let start = parse_date("start", &request.start)?;
        let end = parse_end_date(request)?;
        self.ensure_known(&request.idnectums)?;

        let conditions: Arc<[Condition]> = request.entry_conditions().into();
        let page_size = self.config.page_size;

        let mut receivers = Vec::with_capacity(request.idnectums.len());
        for &id in &request.idnectums {
            let (tx, rx) = sync_channel::<StreamEvent>(self.config.channel_capacity);
            receivers.push(rx);

            let store = Arc::clone(&self.store);
            let conditions = Arc::clone(&conditions);
            self.pool.spawn(move || {
                let outcome = stream_instrument(
                    store.as_ref(),
                    id,
                    &conditions,
                    start,
                    end,
                    page_size,
                    // A send failure means the consumer gave up; stop
                    // producing instead of evaluating into the void.
                    &mut |bytes| {
                        tx.send(StreamEvent::Chunk(bytes))
                            .map_err(|_| consumer_disconnected())
                    },
                );
                let _ = match outcome {
                    Ok(()) => tx.send(StreamEvent::Done),
                    Err(err) => tx.send(StreamEvent::Failed(err)),
                };
            });
        }

        for rx in receivers {
            loop {
                match rx.recv() {
                    Ok(StreamEvent::Chunk(bytes)) => {
                        sink.write_all(&bytes)?;
                        sink.flush()?;
                    }
                    Ok(StreamEvent::Done) => break,
                    Ok(StreamEvent::Failed(err)) => return Err(err),
                    Err(_) => {
                        return Err(EngineError::Io(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "stream worker exited without a result",
                        )))
                    }
                }
            }
        }
        Ok(())
    }

    /// Replay a cached stream if one exists; otherwise generate the
    /// sequential stream, teeing the bytes into a fingerprint-keyed cache
    /// file. A failed generation removes its partial file.
    pub fn stream_cached(
        &self,
        request: &EvalRequest,
        sink: &mut dyn Write,
    ) -> Result<(), EngineError> {
        let fingerprint = Fingerprint::of(request);
        if self.stream_cache.replay(&fingerprint, sink)? {
            tracing::debug!("stream cache replay for {fingerprint}");
            return Ok(());
        }

        // Validate before the tee opens so a bad request leaves no temp
        // file behind.
        let start = parse_date("start", &request.start)?;
        let end = parse_end_date(request)?;
        self.ensure_known(&request.idnectums)?;

        let conditions = request.entry_conditions();
        let page_size = self.config.page_size;
        let mut tee = self.stream_cache.begin(&fingerprint, sink)?;

        let mut outcome = Ok(());
        for &id in &request.idnectums {
            outcome = stream_instrument(
                self.store.as_ref(),
                id,
                conditions,
                start,
                end,
                page_size,
                &mut |bytes| {
                    tee.write_all(&bytes)?;
                    tee.flush()?;
                    Ok(())
                },
            );
            if outcome.is_err() {
                break;
            }
        }

        match outcome {
            Ok(()) => tee.commit(),
            Err(err) => {
                tee.abort();
                Err(err)
            }
        }
    }

    fn ensure_known(&self, ids: &[InstrumentId]) -> Result<(), EngineError> {
        for &id in ids {
            if !self.store.exists(id) {
                return Err(EngineError::UnknownInstrument(id));
            }
        }
        Ok(())
    }
}

enum StreamEvent {
    Chunk(Vec<u8>),
    Done,
    Failed(EngineError),
}

fn consumer_disconnected() -> EngineError {
    EngineError::Io(io::Error::new(
        io::ErrorKind::BrokenPipe,
        "stream consumer disconnected",
    ))
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| EngineError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

fn parse_end_date(request: &EvalRequest) -> Result<Option<NaiveDate>, EngineError> {
    match &request.end {
        Some(end) => Ok(Some(parse_date("end", end)?)),
        None => Ok(None),
    }
}

/// Stream one instrument's wire block: header, comma-separated records,
/// footer.
///
/// The store is read page by page and each page becomes its own short
/// series, so indicator state never carries across a page boundary.
/// Emission is chunk-at-a-time; the caller decides how bytes reach the
/// sink and when to flush.
fn stream_instrument(
    store: &dyn BarStore,
    id: InstrumentId,
    conditions: &[Condition],
    start: NaiveDate,
    end: Option<NaiveDate>,
    page_size: usize,
    emit: &mut dyn FnMut(Vec<u8>) -> Result<(), EngineError>,
) -> Result<(), EngineError> {
    emit(format!("{{\"idnectum\":{id},\"result\":[").into_bytes())?;

    let mut page = 0;
    let mut wrote_any = false;
    'pages: loop {
        let store_page = store.load_page(id, start, page, page_size)?;
        let is_last = store_page.is_last;
        let series = Arc::new(BarSeries::from_records(
            format!("idnectum_{id}_page_{page}"),
            store_page.records,
        ));
        let mut cache = IndicatorCache::new(Arc::clone(&series));

        for index in 0..series.len() {
            let bar = &series.bars()[index];
            if end.is_some_and(|end| bar.date > end) {
                break 'pages;
            }
            let mut record = ResultRecord::from_bar(bar);
            evaluate_conditions(conditions, index, &mut cache, &mut record);

            let mut bytes = Vec::new();
            if wrote_any {
                bytes.push(b',');
            }
            serde_json::to_writer(&mut bytes, &record)?;
            emit(bytes)?;
            wrote_any = true;
        }

        if is_last {
            break;
        }
        page += 1;
    }

    emit(b"]}\n".to_vec())?;
    tracing::debug!("streamed instrument {id}: {} page(s)", page + 1);
    Ok(())
}
