//! Parquet-backed history store with Hive-style partitioning.
//!
//! Layout: `{root}/instrument={ID}/bars.parquet`
//!
//! Features:
//! - Atomic writes (write to .tmp, rename into place)
//! - Nullable OHLCV columns, so NULL store fields survive a roundtrip
//! - Integrity validation on load (schema check, row count > 0)
//! - Metadata sidecar per instrument (hash, date range, source)
//! - CSV import and seeded synthetic generation for fixtures

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use barcast_core::domain::{InstrumentId, StoreRecord};

use super::{slice_page, BarStore, StoreError, StorePage};

/// Metadata sidecar for a stored instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    pub instrument: InstrumentId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub row_count: usize,
    pub data_hash: String,
    pub source: String,
    pub written_at: chrono::NaiveDateTime,
}

/// The Parquet store.
pub struct ParquetStore {
    root: PathBuf,
}

impl ParquetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for a specific instrument: `{root}/instrument={ID}/`
    fn instrument_dir(&self, id: InstrumentId) -> PathBuf {
        self.root.join(format!("instrument={id}"))
    }

    fn bars_path(&self, id: InstrumentId) -> PathBuf {
        self.instrument_dir(id).join("bars.parquet")
    }

    fn meta_path(&self, id: InstrumentId) -> PathBuf {
        self.instrument_dir(id).join("meta.json")
    }

    /// Write the full history for an instrument, replacing any existing file.
    ///
    /// Rows are sorted by date before writing so reads come back ascending.
    /// Writes are atomic: write to .tmp then rename.
    pub fn write_records(
        &self,
        id: InstrumentId,
        records: &[StoreRecord],
    ) -> Result<(), StoreError> {
        self.write_with_source(id, records, "direct")
    }

    fn write_with_source(
        &self,
        id: InstrumentId,
        records: &[StoreRecord],
        source: &str,
    ) -> Result<(), StoreError> {
        if records.is_empty() {
            return Err(StoreError::Io(format!(
                "no records to write for instrument {id}"
            )));
        }

        let dir = self.instrument_dir(id);
        fs::create_dir_all(&dir)
            .map_err(|e| StoreError::Io(format!("failed to create dir: {e}")))?;

        let mut rows = records.to_vec();
        rows.sort_by_key(|r| r.date);

        let df = records_to_dataframe(&rows)?;
        let path = self.bars_path(id);
        let tmp_path = path.with_extension("parquet.tmp");

        write_parquet(&df, &tmp_path)?;

        // Atomic rename
        fs::rename(&tmp_path, &path).map_err(|e| {
            // Clean up temp file on rename failure
            let _ = fs::remove_file(&tmp_path);
            StoreError::Io(format!("atomic rename failed: {e}"))
        })?;

        // Write metadata sidecar
        let meta = StoreMeta {
            instrument: id,
            start_date: rows.first().unwrap().date,
            end_date: rows.last().unwrap().date,
            row_count: rows.len(),
            data_hash: blake3::hash(
                &serde_json::to_vec(&rows)
                    .map_err(|e| StoreError::Io(format!("hash serialization: {e}")))?,
            )
            .to_hex()
            .to_string(),
            source: source.to_string(),
            written_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| StoreError::Io(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(id), meta_json)
            .map_err(|e| StoreError::Io(format!("meta write: {e}")))?;

        Ok(())
    }

    /// Metadata for an instrument, if both the sidecar and history exist.
    pub fn meta(&self, id: InstrumentId) -> Option<StoreMeta> {
        let content = fs::read_to_string(self.meta_path(id)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Instrument ids present in the store, ascending.
    pub fn instruments(&self) -> Vec<InstrumentId> {
        let mut ids = Vec::new();
        let Ok(entries) = fs::read_dir(&self.root) else {
            return ids;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(id) = name.strip_prefix("instrument=") {
                if let Ok(id) = id.parse::<InstrumentId>() {
                    ids.push(id);
                }
            }
        }
        ids.sort_unstable();
        ids
    }

    /// Import a CSV history file for an instrument.
    ///
    /// Expected header: `date,open,high,low,close,volume` with dates as
    /// `YYYY-MM-DD`. Empty numeric fields become NULLs. Returns the number
    /// of rows imported.
    pub fn import_csv(&self, id: InstrumentId, path: &Path) -> Result<usize, StoreError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| StoreError::Csv(format!("open {}: {e}", path.display())))?;

        let mut rows = Vec::new();
        for result in reader.deserialize::<CsvRow>() {
            let row = result.map_err(|e| StoreError::Csv(format!("parse row: {e}")))?;
            rows.push(StoreRecord {
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }
        if rows.is_empty() {
            return Err(StoreError::Csv(format!(
                "no rows in {}",
                path.display()
            )));
        }

        self.write_with_source(id, &rows, "csv")?;
        Ok(rows.len())
    }

    /// Generate a seeded random-walk history for an instrument.
    ///
    /// Same seed, same bars, so fixtures stay reproducible across runs.
    /// Returns the number of bars written.
    pub fn generate_synthetic(
        &self,
        id: InstrumentId,
        start: NaiveDate,
        days: usize,
        seed: u64,
    ) -> Result<usize, StoreError> {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        // Daily return = drift + volatility * noise, ~20% annual drift.
        const DRIFT: f64 = 0.0008;
        const VOLATILITY: f64 = 0.012;

        let mut rng = StdRng::seed_from_u64(seed);
        let mut close = 100.0 + rng.gen_range(0.0..50.0);
        let mut rows = Vec::with_capacity(days);

        for offset in 0..days {
            let open = close;
            let noise = rng.gen_range(-1.0..1.0);
            close = (close * (1.0 + DRIFT + VOLATILITY * noise)).max(1.0);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.006));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.006));
            rows.push(StoreRecord {
                date: start + chrono::Duration::days(offset as i64),
                open: Some(open),
                high: Some(high),
                low: Some(low),
                close: Some(close),
                volume: Some(rng.gen_range(400_000..2_600_000)),
            });
        }

        self.write_with_source(id, &rows, "synthetic")?;
        Ok(rows.len())
    }
}

impl BarStore for ParquetStore {
    fn exists(&self, id: InstrumentId) -> bool {
        self.bars_path(id).is_file()
    }

    fn load_full_history(&self, id: InstrumentId) -> Result<Vec<StoreRecord>, StoreError> {
        let path = self.bars_path(id);
        if !path.is_file() {
            return Err(StoreError::NotFound(id));
        }
        load_and_validate_parquet(&path, id)
    }

    fn load_page(
        &self,
        id: InstrumentId,
        start: NaiveDate,
        page: usize,
        page_size: usize,
    ) -> Result<StorePage, StoreError> {
        let rows = self.load_full_history(id)?;
        let from = rows.partition_point(|r| r.date < start);
        Ok(slice_page(&rows[from..], page, page_size))
    }
}

/// CSV import row. Empty numeric fields deserialize to None.
#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<i64>,
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

/// Convert store rows to a Polars DataFrame with nullable OHLCV columns.
fn records_to_dataframe(rows: &[StoreRecord]) -> Result<DataFrame, StoreError> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let dates: Vec<i32> = rows
        .iter()
        .map(|r| (r.date - epoch).num_days() as i32)
        .collect();
    let opens: Vec<Option<f64>> = rows.iter().map(|r| r.open).collect();
    let highs: Vec<Option<f64>> = rows.iter().map(|r| r.high).collect();
    let lows: Vec<Option<f64>> = rows.iter().map(|r| r.low).collect();
    let closes: Vec<Option<f64>> = rows.iter().map(|r| r.close).collect();
    let volumes: Vec<Option<i64>> = rows.iter().map(|r| r.volume).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| StoreError::Parquet(format!("date cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| StoreError::Parquet(format!("dataframe creation: {e}")))
}

/// Write a DataFrame to a Parquet file.
fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), StoreError> {
    let file =
        fs::File::create(path).map_err(|e| StoreError::Parquet(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| StoreError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

/// Load a Parquet file and validate its integrity.
fn load_and_validate_parquet(
    path: &Path,
    id: InstrumentId,
) -> Result<Vec<StoreRecord>, StoreError> {
    let file = fs::File::open(path).map_err(|e| StoreError::Parquet(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| StoreError::Parquet(format!("read: {e}")))?;

    // Validate: must have rows
    if df.height() == 0 {
        return Err(StoreError::Corrupt {
            id,
            reason: "empty parquet file".into(),
        });
    }

    // Validate: must have expected columns
    for col_name in ["date", "open", "high", "low", "close", "volume"] {
        if df.column(col_name).is_err() {
            return Err(StoreError::Corrupt {
                id,
                reason: format!("missing column '{col_name}'"),
            });
        }
    }

    dataframe_to_records(&df, id)
}

/// Convert a DataFrame back to store rows, keeping NULLs as None.
fn dataframe_to_records(df: &DataFrame, id: InstrumentId) -> Result<Vec<StoreRecord>, StoreError> {
    let map_err = |e: PolarsError| StoreError::Parquet(format!("column read: {e}"));

    let dates = df.column("date").map_err(map_err)?;
    let opens = df.column("open").map_err(map_err)?;
    let highs = df.column("high").map_err(map_err)?;
    let lows = df.column("low").map_err(map_err)?;
    let closes = df.column("close").map_err(map_err)?;
    let volumes = df.column("volume").map_err(map_err)?;

    let date_ca = dates
        .date()
        .map_err(|e| StoreError::Parquet(format!("date column type: {e}")))?;
    let open_ca = opens
        .f64()
        .map_err(|e| StoreError::Parquet(format!("open column type: {e}")))?;
    let high_ca = highs
        .f64()
        .map_err(|e| StoreError::Parquet(format!("high column type: {e}")))?;
    let low_ca = lows
        .f64()
        .map_err(|e| StoreError::Parquet(format!("low column type: {e}")))?;
    let close_ca = closes
        .f64()
        .map_err(|e| StoreError::Parquet(format!("close column type: {e}")))?;
    let vol_ca = volumes
        .i64()
        .map_err(|e| StoreError::Parquet(format!("volume column type: {e}")))?;

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let n = df.height();
    let mut rows = Vec::with_capacity(n);

    for i in 0..n {
        let date_days = date_ca.get(i).ok_or_else(|| StoreError::Corrupt {
            id,
            reason: format!("null date at row {i}"),
        })?;
        rows.push(StoreRecord {
            date: epoch + chrono::Duration::days(date_days as i64),
            open: open_ca.get(i),
            high: high_ca.get(i),
            low: low_ca.get(i),
            close: close_ca.get(i),
            volume: vol_ca.get(i),
        });
    }

    Ok(rows)
}
